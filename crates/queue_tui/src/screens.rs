//! Screen rendering functions for the TUI.

use crate::app::{removal_prompt, LoginField, LoginForm, Mode, PatientField, RenderState};
use queue_client::dashboard::StaffView;
use queue_client::display::{DisplayView, Upcoming, NO_PATIENTS_WAITING};
use queue_client::models::Priority;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
};

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::Normal => Color::Green,
        Priority::Urgent => Color::Yellow,
        Priority::Emergency => Color::Red,
    }
}

/// Rectangle of `width` x `height` centred in `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Draw login screen
pub fn draw_login(frame: &mut Frame, area: Rect, form: &LoginForm, busy: Option<&str>) {
    let field_style = |field: LoginField| {
        if form.focus == field {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Email:    ", field_style(LoginField::Email)),
            Span::raw(form.email.clone()),
        ]),
        Line::from(vec![
            Span::styled("Password: ", field_style(LoginField::Password)),
            Span::raw(form.masked_password()),
        ]),
        Line::from(""),
    ];
    if let Some(busy) = busy {
        lines.push(Line::from(Span::styled(
            busy.to_string(),
            Style::default().fg(Color::Yellow),
        )));
    } else if let Some(error) = &form.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "[Tab] Switch field  [Enter] Sign in  [Esc] Quit",
        Style::default().fg(Color::DarkGray),
    )));

    let form_area = centered(area, 60, 9);
    frame.render_widget(Clear, form_area);
    let login = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().title(" Walk-in Queue - Sign In ").borders(Borders::ALL));
    frame.render_widget(login, form_area);
}

/// Draw staff screen: counters, optional add form, queue table
pub fn draw_staff(frame: &mut Frame, area: Rect, state: &RenderState) {
    let form_height = if state.mode == Mode::AddPatient { 7 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),           // Counters
            Constraint::Length(form_height), // Add form
            Constraint::Min(0),              // Queue
        ])
        .split(area);

    draw_counters(frame, chunks[0], &state.staff);
    if state.mode == Mode::AddPatient {
        draw_patient_form(frame, chunks[1], state);
    }
    draw_queue(frame, chunks[2], &state.staff, state.selected);

    if let Mode::ConfirmRemoval { name, .. } = &state.mode {
        let popup = centered(area, 60, 5);
        frame.render_widget(Clear, popup);
        let prompt = Paragraph::new(vec![
            Line::from(removal_prompt(name)),
            Line::from(""),
            Line::from(Span::styled(
                "[y] Remove  [n] Cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .alignment(Alignment::Center)
        .block(Block::default().title(" Confirm ").borders(Borders::ALL));
        frame.render_widget(prompt, popup);
    }
}

fn draw_counters(frame: &mut Frame, area: Rect, view: &StaffView) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(area);

    let counters = [
        ("Waiting", view.waiting.to_string(), Color::Yellow),
        ("In Consultation", view.in_consultation.to_string(), Color::Cyan),
        ("Completed Today", view.completed_today.to_string(), Color::Green),
        ("Now Serving", view.current.clone(), Color::Magenta),
    ];
    for ((title, value, color), chunk) in counters.into_iter().zip(chunks.iter()) {
        let counter = Paragraph::new(Span::styled(
            value,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .block(Block::default().title(format!(" {title} ")).borders(Borders::ALL));
        frame.render_widget(counter, *chunk);
    }
}

fn draw_patient_form(frame: &mut Frame, area: Rect, state: &RenderState) {
    let form = &state.patient;
    let lines: Vec<Line> = [
        PatientField::Name,
        PatientField::Age,
        PatientField::Phone,
        PatientField::Complaint,
        PatientField::Priority,
    ]
    .into_iter()
    .map(|field| {
        let label_style = if form.focus == field {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let value_style = if field == PatientField::Priority {
            Style::default().fg(priority_color(form.priority))
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{:<10} ", field.label()), label_style),
            Span::styled(form.value(field), value_style),
        ])
    })
    .collect();

    let paragraph = Paragraph::new(lines)
        .block(Block::default().title(" Add Patient ").borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn draw_queue(frame: &mut Frame, area: Rect, view: &StaffView, selected: usize) {
    let header_cells = ["No.", "Patient", "Complaint", "Priority", "Status", "Actions"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow)));
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = match view.empty_message() {
        Some(message) => vec![Row::new(vec![
            Cell::from(""),
            Cell::from(message).style(Style::default().fg(Color::DarkGray)),
        ])],
        None => view
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let style = if idx == selected {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                let patient = match &row.age {
                    Some(age) => format!("{} ({age})", row.name),
                    None => row.name.clone(),
                };
                let actions: Vec<&str> = row.actions.iter().map(|a| a.label()).collect();

                Row::new(vec![
                    Cell::from(row.number.clone()),
                    Cell::from(patient),
                    Cell::from(row.complaint.clone()),
                    Cell::from(row.priority.label())
                        .style(Style::default().fg(priority_color(row.priority))),
                    Cell::from(row.status.clone()),
                    Cell::from(actions.join(" ")),
                ])
                .style(style)
            })
            .collect(),
    };

    let widths = [
        Constraint::Length(6),
        Constraint::Min(20),
        Constraint::Min(16),
        Constraint::Length(10),
        Constraint::Length(16),
        Constraint::Length(16),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(" Queue ").borders(Borders::ALL));
    frame.render_widget(table, area);
}

/// Draw public display screen
pub fn draw_display(frame: &mut Frame, area: Rect, view: &DisplayView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Now serving
            Constraint::Length(3), // Waiting count
            Constraint::Min(0),    // Upcoming
            Constraint::Length(1), // Updated
        ])
        .split(area);

    let current = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            view.current.clone(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
    ])
    .alignment(Alignment::Center)
    .block(Block::default().title(" Now Serving ").borders(Borders::ALL));
    frame.render_widget(current, chunks[0]);

    let waiting = Paragraph::new(view.waiting.clone())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(waiting, chunks[1]);

    let upcoming_block = Block::default().title(" Up Next ").borders(Borders::ALL);
    match &view.upcoming {
        Upcoming::NoneWaiting => {
            let empty = Paragraph::new(NO_PATIENTS_WAITING)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray))
                .block(upcoming_block);
            frame.render_widget(empty, chunks[2]);
        }
        Upcoming::Tiles(tiles) => {
            let inner = upcoming_block.inner(chunks[2]);
            frame.render_widget(upcoming_block, chunks[2]);

            let constraints = vec![Constraint::Ratio(1, tiles.len() as u32); tiles.len()];
            let slots = Layout::default()
                .direction(Direction::Horizontal)
                .constraints(constraints)
                .split(inner);
            for (tile, slot) in tiles.iter().zip(slots.iter()) {
                let widget = Paragraph::new(vec![
                    Line::from(Span::styled(
                        tile.number.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        tile.priority.label(),
                        Style::default().fg(priority_color(tile.priority)),
                    )),
                ])
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
                frame.render_widget(widget, *slot);
            }
        }
    }

    let updated = Paragraph::new(format!("Updated {}", view.updated))
        .alignment(Alignment::Right)
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(updated, chunks[3]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, PatientForm, Screen};
    use queue_client::dashboard::EMPTY_QUEUE_MESSAGE;
    use queue_client::models::{DisplaySnapshot, EntryId, QueueEntry, QueueSnapshot, Status, UpcomingNumber};
    use ratatui::backend::TestBackend;

    fn render(state: &RenderState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 32)).unwrap();
        terminal.draw(|frame| App::draw(frame, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn state(screen: Screen) -> RenderState {
        RenderState {
            screen,
            user: "Dr Jane Smith".to_string(),
            login: LoginForm::default(),
            staff: StaffView::default(),
            display: DisplayView::default(),
            patient: PatientForm::default(),
            mode: Mode::Browse,
            selected: 0,
            status: None,
            busy: None,
        }
    }

    #[test]
    fn test_empty_staff_screen() {
        let text = render(&state(Screen::Staff));
        assert!(text.contains("Signed in as Dr Jane Smith"));
        assert!(text.contains(EMPTY_QUEUE_MESSAGE));
        assert!(text.contains("---"));
    }

    #[test]
    fn test_staff_rows_and_errors() {
        let mut state = state(Screen::Staff);
        state.staff = StaffView::from_snapshot(&QueueSnapshot {
            entries: vec![QueueEntry {
                id: EntryId::new("7"),
                queue_number: "12".to_string(),
                patient_name: "John Doe".to_string(),
                patient_age: Some("35".to_string()),
                patient_phone: None,
                complaint: Some("Headache".to_string()),
                priority: Priority::Urgent,
                status: Status::InConsultation,
            }],
            waiting_count: 0,
            in_consultation_count: 1,
            completed_today: 3,
            current_number: Some("12".to_string()),
        });
        state.status = Some("Error calling patient: Patient not found".to_string());

        let text = render(&state);
        assert!(text.contains("#12"));
        assert!(text.contains("John Doe"));
        assert!(text.contains("in consultation"));
        assert!(text.contains("Complete Remove"));
        assert!(text.contains("Error calling patient: Patient not found"));
        assert!(!text.contains(EMPTY_QUEUE_MESSAGE));
    }

    #[test]
    fn test_removal_confirmation_overlay() {
        let mut state = state(Screen::Staff);
        state.mode = Mode::ConfirmRemoval {
            id: EntryId::new("7"),
            name: "John Doe".to_string(),
        };
        let text = render(&state);
        assert!(text.contains("Remove this patient from queue?"));
    }

    #[test]
    fn test_login_screen_shows_inline_error() {
        let mut state = state(Screen::Login);
        state.login.error = Some("Invalid credentials".to_string());
        let text = render(&state);
        assert!(text.contains("Invalid credentials"));
        assert!(!text.contains("Signed in as"));
    }

    #[test]
    fn test_display_screen() {
        let mut state = state(Screen::Display);
        state.display = DisplayView::from_snapshot(&DisplaySnapshot {
            current_number: Some("15".to_string()),
            next_numbers: vec![
                UpcomingNumber {
                    number: "16".to_string(),
                    priority: Priority::Normal,
                },
                UpcomingNumber {
                    number: "17".to_string(),
                    priority: Priority::Urgent,
                },
            ],
            waiting_count: 5,
            updated_at: None,
        });

        let text = render(&state);
        assert!(text.contains("15"));
        assert!(text.contains("5 people waiting"));
        assert!(text.contains("16"));
        assert!(text.contains("17"));
        assert!(text.contains("Updated —"));
        assert!(!text.contains("Signed in as"));
    }

    #[test]
    fn test_idle_display() {
        let text = render(&state(Screen::Display));
        assert!(text.contains("---"));
        assert!(text.contains(NO_PATIENTS_WAITING));
        assert!(text.contains("0 people waiting"));
    }
}
