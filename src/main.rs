use arboard::Clipboard;
use macroquad::prelude::*;
use pathlab::config::Config;
use pathlab::session_log::{SessionEvent, SessionLog};
use pathlab::{AstarEngine, ClickOutcome, FrameRecorder, GridMap, Outcome, Pos, Rgb, Simulator, TickStatus};
use std::sync::OnceLock;

static CONFIG: OnceLock<Config> = OnceLock::new();

fn window_conf() -> Conf {
    let config = CONFIG.get_or_init(Config::load);
    Conf {
        window_title: config.window.title.clone(),
        window_width: config.window.width,
        window_height: config.window.height,
        ..Default::default()
    }
}

fn to_screen_color(color: Rgb) -> Color {
    Color::from_rgba(color.r, color.g, color.b, 255)
}

/// Copy the map layout to the system clipboard as text rows.
fn copy_layout_to_clipboard(grid: &GridMap) {
    match Clipboard::new() {
        Ok(mut clipboard) => {
            if let Err(e) = clipboard.set_text(grid.layout_string()) {
                println!("Failed to copy to clipboard: {}", e);
            } else {
                println!("Grid layout copied to clipboard!");
                // Keep clipboard alive for a moment to ensure clipboard managers can capture it
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
        }
        Err(e) => {
            println!("Failed to access clipboard: {}", e);
        }
    }
}

/// Replace the map with a layout read from the system clipboard.
fn paste_layout_from_clipboard(grid: &mut GridMap) -> bool {
    match Clipboard::new() {
        Ok(mut clipboard) => match clipboard.get_text() {
            Ok(text) => match grid.apply_layout(&text) {
                Ok(()) => {
                    println!("Grid layout pasted from clipboard!");
                    true
                }
                Err(e) => {
                    println!("Clipboard does not hold a valid layout: {}", e);
                    false
                }
            },
            Err(e) => {
                println!("Failed to read clipboard: {}", e);
                false
            }
        },
        Err(e) => {
            println!("Failed to access clipboard: {}", e);
            false
        }
    }
}

fn draw_grid(grid: &GridMap, background: Color) {
    clear_background(background);

    let cell_px = grid.cell_px() as f32;
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let cell = grid.cell(Pos::new(row, col));
            draw_rectangle(
                col as f32 * cell_px,
                row as f32 * cell_px,
                cell_px,
                cell_px,
                to_screen_color(cell.display_color()),
            );
        }
    }

    let line = to_screen_color(pathlab::palette::GRID_LINE);
    let width = grid.width_px() as f32;
    let height = grid.height_px() as f32;
    for row in 0..=grid.rows {
        let y = row as f32 * cell_px;
        draw_line(0.0, y, width, y, 1.0, line);
    }
    for col in 0..=grid.cols {
        let x = col as f32 * cell_px;
        draw_line(x, 0.0, x, height, 1.0, line);
    }
}

fn draw_help(running: bool) {
    if running {
        draw_text("running...", 10.0, 20.0, 18.0, DARKGRAY);
        return;
    }
    let lines = [
        "Left click: place start / goal / obstacle",
        "Right click: erase cell",
        "SPACE: run search   O: run with local sensing",
        "C: clear map   X: copy layout   V: paste layout",
        "G: export GIF   ESC: quit",
    ];
    let mut y = 20.0;
    for line in lines {
        draw_text(line, 10.0, y, 18.0, DARKGRAY);
        y += 18.0;
    }
}

fn report_click(outcome: ClickOutcome, session: &mut SessionLog) {
    match outcome {
        ClickOutcome::PlacedStart(pos) => {
            session.log(SessionEvent::PlacedStart { row: pos.row, col: pos.col });
        }
        ClickOutcome::PlacedGoal(pos) => {
            session.log(SessionEvent::PlacedGoal { row: pos.row, col: pos.col });
        }
        ClickOutcome::PlacedObstacle(pos) => {
            session.log(SessionEvent::PlacedObstacle { row: pos.row, col: pos.col });
        }
        ClickOutcome::Erased(pos) => {
            session.log(SessionEvent::ErasedCell { row: pos.row, col: pos.col });
        }
        ClickOutcome::Rejected(pos) => {
            println!("Start and goal can never overlap an obstacle or each other!");
            session.log(SessionEvent::PlacementRejected { row: pos.row, col: pos.col });
        }
    }
}

fn report_outcome(outcome: Outcome, session: &mut SessionLog) {
    match outcome {
        Outcome::PathFound => println!("Path found!"),
        Outcome::NoPath => println!("No path found!"),
        Outcome::Arrived => println!("Arrived at the goal!"),
        Outcome::Cancelled => println!("Run cancelled."),
    }
    session.log(SessionEvent::RunFinished {
        outcome: outcome.to_string(),
    });
}

#[macroquad::main(window_conf)]
async fn main() {
    let config = CONFIG.get_or_init(Config::load);
    let background = Color::from_rgba(
        config.window.background_r,
        config.window.background_g,
        config.window.background_b,
        255,
    );

    let mut grid = GridMap::new(
        config.grid.rows,
        config.grid.cols,
        config.window.width,
        config.window.height,
    );
    let max_frames = match config.export.max_frames {
        0 => None,
        bound => Some(bound),
    };
    let mut sim = Simulator::new(AstarEngine::new(), FrameRecorder::new(max_frames));
    sim.set_capture(config.simulation.capture_frames);

    let mut session = SessionLog::new();
    let mut roam_clock = 0.0f32;

    prevent_quit();
    loop {
        if is_quit_requested() || is_key_pressed(KeyCode::Escape) {
            if sim.is_running() {
                sim.request_cancel();
                if let TickStatus::Finished(outcome) = sim.tick(&mut grid) {
                    report_outcome(outcome, &mut session);
                }
            }
            break;
        }

        if sim.is_running() {
            let status = if sim.is_roaming() {
                roam_clock += get_frame_time();
                if roam_clock >= config.simulation.step_delay_secs {
                    roam_clock = 0.0;
                    sim.tick(&mut grid)
                } else {
                    TickStatus::Running
                }
            } else {
                sim.tick(&mut grid)
            };
            if let TickStatus::Finished(outcome) = status {
                report_outcome(outcome, &mut session);
            }
        } else {
            // Map editing and control keys only apply between runs.
            if is_mouse_button_pressed(MouseButton::Left) {
                let (mouse_x, mouse_y) = mouse_position();
                if let Some(outcome) = grid.handle_click(mouse_x, mouse_y, false) {
                    report_click(outcome, &mut session);
                }
            } else if is_mouse_button_pressed(MouseButton::Right) {
                let (mouse_x, mouse_y) = mouse_position();
                if let Some(outcome) = grid.handle_click(mouse_x, mouse_y, true) {
                    report_click(outcome, &mut session);
                }
            }

            if is_key_pressed(KeyCode::Space) {
                match sim.start_search_run(&mut grid) {
                    Ok(()) => session.log(SessionEvent::SearchRunStarted),
                    Err(e) => {
                        println!("{}", e);
                        session.log(SessionEvent::RunRejected { reason: e });
                    }
                }
            }

            if is_key_pressed(KeyCode::O) {
                match sim.start_roaming_run(&mut grid, config.simulation.sense_radius) {
                    Ok(()) => {
                        roam_clock = 0.0;
                        session.log(SessionEvent::RoamingRunStarted {
                            radius: config.simulation.sense_radius,
                        });
                    }
                    Err(e) => {
                        println!("{}", e);
                        session.log(SessionEvent::RunRejected { reason: e });
                    }
                }
            }

            if is_key_pressed(KeyCode::C) {
                grid.reset();
                println!("Map cleared.");
                session.log(SessionEvent::MapCleared);
            }

            if is_key_pressed(KeyCode::X) {
                copy_layout_to_clipboard(&grid);
                session.log(SessionEvent::LayoutCopied);
            }

            if is_key_pressed(KeyCode::V) && paste_layout_from_clipboard(&mut grid) {
                session.log(SessionEvent::LayoutPasted);
            }

            if is_key_pressed(KeyCode::G) {
                let export = &config.export;
                match sim
                    .recorder()
                    .export_gif(&export.gif_path, export.fps, export.end_hold_secs)
                {
                    Ok(()) => {
                        let frames = sim.recorder().frame_count();
                        println!("Saved {} frames to {}", frames, export.gif_path);
                        if sim.recorder().dropped_count() > 0 {
                            println!(
                                "({} frames were dropped by the capture limit)",
                                sim.recorder().dropped_count()
                            );
                        }
                        session.log(SessionEvent::GifExported {
                            path: export.gif_path.clone(),
                            frames,
                        });
                    }
                    Err(e) => println!("GIF export failed: {}", e),
                }
            }
        }

        draw_grid(&grid, background);
        draw_help(sim.is_running());
        next_frame().await
    }

    if config.logging.enable_session_log {
        match session.save_to_file(&config.logging.session_log_path) {
            Ok(()) => println!("Session log saved to {}", config.logging.session_log_path),
            Err(e) => eprintln!("Failed to save session log: {}", e),
        }
        println!("{}", session.summary());
    }
}
