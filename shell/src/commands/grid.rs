use owo_colors::OwoColorize;
use viewport::{Fill, ViewportState};

/// Draw the grid, two terminal columns per cell.
pub fn render(state: &ViewportState, plain: bool) -> String {
    let grid = state.grid();
    if plain {
        let mut frame = grid.render_text();
        frame.push('\n');
        return frame;
    }

    let mut frame = String::new();
    for row in grid.rows() {
        for fill in row {
            let cell = match fill {
                Fill::Painted(color) => "██".truecolor(color.r, color.g, color.b).to_string(),
                Fill::Background => "··".dimmed().to_string(),
            };
            frame.push_str(&cell);
        }
        frame.push('\n');
    }
    frame
}
