use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};

use super::map::{CellKind, Coordinate, GridConfig};

/// Draws the grid with the first `cursor + 1` cells of `path` marked and the
/// agent on `path[cursor]`. An empty path puts the agent on the start cell.
pub fn render_grid(grid: &GridConfig, path: &[Coordinate], cursor: usize) -> Text<'static> {
    let visited = if path.is_empty() {
        &path[..0]
    } else {
        &path[..=cursor.min(path.len() - 1)]
    };
    let agent = visited.last().copied().unwrap_or_else(|| grid.start());

    let mut lines = Vec::with_capacity(grid.size());
    for row in 0..grid.size() as i32 {
        let mut spans = Vec::with_capacity(grid.size());
        for col in 0..grid.size() as i32 {
            let cell = Coordinate { row, col };
            let is_agent = cell == agent;
            let on_path = visited.contains(&cell);
            let kind = grid.classify(cell);

            let style = if is_agent {
                Style::default().fg(Color::Green).bg(Color::Black)
            } else {
                match kind {
                    CellKind::Obstacle => Style::default().bg(Color::White),
                    CellKind::Win => Style::default().fg(Color::Black).bg(Color::Yellow),
                    CellKind::Lose => Style::default().fg(Color::Black).bg(Color::Red),
                    _ if on_path => Style::default().fg(Color::Cyan).bg(Color::DarkGray),
                    _ => Style::default().bg(Color::DarkGray),
                }
            };

            let glyph = match (is_agent, kind) {
                (true, _) => " @ ",
                (false, CellKind::Win) => " G ",
                (false, CellKind::Lose) => " X ",
                (false, CellKind::Obstacle) => "   ",
                _ if cell == grid.start() => " S ",
                _ if on_path => " · ",
                _ => "   ",
            };

            spans.push(Span::styled(glyph, style));
        }
        lines.push(Line::from(spans));
    }

    // a path that walked off the grid ends on a cell we cannot draw
    if let Some(&off) = visited.last().filter(|&&c| !grid.contains(c)) {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("walked off the grid at {off}"),
            Style::default().fg(Color::Red),
        )));
    }

    Text::from(lines)
}

pub fn render_status(complete: bool, moves: usize, episodes: usize) -> Text<'static> {
    let headline = if complete {
        Line::from(Span::styled(
            format!("Reached the goal in {moves} moves"),
            Style::default().fg(Color::Black).bg(Color::Green),
        ))
    } else {
        Line::from(Span::styled(
            format!("No complete path yet ({moves} moves)"),
            Style::default().fg(Color::White).bg(Color::Red),
        ))
    };

    Text::from(vec![
        headline,
        Line::from(""),
        Line::from(format!("Episodes trained: {episodes}")),
        Line::from("Press q to quit"),
    ])
}

/// Replay cursor out of the path's total moves.
pub fn render_progress(step: usize, moves: usize) -> Text<'static> {
    Text::from(format!("Step {} of {moves}", step.min(moves)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridConfig {
        GridConfig::new(
            3,
            [Coordinate::new(1, 1)],
            Coordinate::new(2, 0),
            Coordinate::new(0, 2),
            Coordinate::new(2, 2),
        )
        .unwrap()
    }

    fn plain(text: &Text) -> Vec<String> {
        text.lines
            .iter()
            .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn draws_every_row() {
        let text = render_grid(&grid(), &[], 0);
        let rows = plain(&text);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], "       G ");
        assert_eq!(rows[2], " @     X ");
    }

    #[test]
    fn cursor_moves_the_agent() {
        let path = [
            Coordinate::new(2, 0),
            Coordinate::new(1, 0),
            Coordinate::new(0, 0),
        ];
        let rows = plain(&render_grid(&grid(), &path, 1));
        assert_eq!(rows[1], " @       ");
        assert_eq!(rows[2], " S     X ");
    }

    #[test]
    fn off_grid_endings_are_reported() {
        let path = [Coordinate::new(2, 0), Coordinate::new(3, 0)];
        let rows = plain(&render_grid(&grid(), &path, 5));
        assert!(rows.last().unwrap().contains("walked off the grid at (3, 0)"));
    }

    #[test]
    fn status_headline_reports_the_full_path() {
        let rows = plain(&render_status(true, 6, 1000));
        assert_eq!(rows[0], "Reached the goal in 6 moves");
        assert_eq!(rows[2], "Episodes trained: 1000");

        let rows = plain(&render_status(false, 3, 10));
        assert_eq!(rows[0], "No complete path yet (3 moves)");
    }

    #[test]
    fn progress_tracks_the_cursor() {
        assert_eq!(plain(&render_progress(2, 6)), ["Step 2 of 6"]);
        assert_eq!(plain(&render_progress(9, 6)), ["Step 6 of 6"]);
    }
}
