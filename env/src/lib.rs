pub trait Env {
    type State;
    type Action;
    type Status;

    // put the agent back on its start cell and return that state
    fn reset(&mut self) -> Self::State;
    // apply an action and return the state the agent ends up in plus what happened
    fn step(&mut self, action: Self::Action) -> (Self::State, Self::Status);
    // get the current state of the environment
    fn current_state(&self) -> Self::State;
    // number of steps taken since the last reset
    fn steps(&self) -> usize;
    // check if the environment is in a terminal state (won or lost)
    fn is_terminal(&self) -> bool;
    // check if the environment is in a win state
    fn is_win(&self) -> bool;
}

pub use rand;
