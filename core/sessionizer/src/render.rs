use std::time::Instant;

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use sessionizer_core::paths::tilde_path;
use sessionizer_core::view::ViewEntry;
use sessionizer_core::{
    AgentState, Controller, EnrichmentClass, Mode, PathDisplay, ProjectKind, RuleStatus,
    WorkspaceNode,
};

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Draws one frame and returns the number of rows available to the list.
pub fn draw(f: &mut Frame, controller: &Controller, now: Instant) -> usize {
    let area = f.area();

    let main_block = Block::default()
        .title(title(controller))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray));

    let inner = main_block.inner(area);
    f.render_widget(main_block, area);

    let chunks = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).split(inner);
    let list_area = chunks[0];
    let footer_area = chunks[1];

    if let Mode::EcosystemPicker { cursor } = controller.mode() {
        render_picker(f, controller, *cursor, list_area);
    } else if controller.view().is_empty() {
        render_empty(f, controller, list_area);
    } else {
        render_list(f, controller, list_area);
    }

    f.render_widget(Paragraph::new(footer(controller, now)), footer_area);
    list_area.height as usize
}

fn spinner(controller: &Controller) -> &'static str {
    SPINNER[controller.spinner_frame() % SPINNER.len()]
}

fn title(controller: &Controller) -> Line<'static> {
    let mut spans = vec![
        Span::styled(" ◆ ", Style::default().fg(Color::Cyan)),
        Span::styled(
            "sessionizer ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("({} projects) ", controller.nodes().len()),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(focus) = controller.config().focus.as_deref() {
        spans.push(Span::styled(
            format!("▸ {} ", sessionizer_core::paths::base_name(focus)),
            Style::default().fg(Color::Magenta),
        ));
    }
    if controller.dirty_only() {
        spans.push(Span::styled("dirty ", Style::default().fg(Color::Yellow)));
    }
    if controller.is_discovering() {
        spans.push(Span::styled(
            format!("{} scanning ", spinner(controller)),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn render_empty(f: &mut Frame, controller: &Controller, area: Rect) {
    let text = if controller.is_discovering() {
        "Scanning for projects..."
    } else if !controller.filter().is_empty() {
        "No projects match the filter"
    } else {
        "No projects found. Add search_roots to config.toml or run `sessionizer setup`"
    };
    let message = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(text, Style::default().fg(Color::DarkGray))),
    ]);
    f.render_widget(message, area);
}

fn render_list(f: &mut Frame, controller: &Controller, area: Rect) {
    let height = area.height as usize;
    let lines: Vec<Line> = controller
        .view()
        .entries
        .iter()
        .enumerate()
        .skip(controller.scroll())
        .take(height)
        .map(|(index, entry)| row(controller, entry, index == controller.cursor()))
        .collect();
    f.render_widget(Paragraph::new(lines), area);
}

fn render_picker(f: &mut Frame, controller: &Controller, cursor: usize, area: Rect) {
    let mut lines = vec![Line::from(Span::styled(
        " Focus on ecosystem (Enter select, Esc cancel)",
        Style::default().fg(Color::Magenta),
    ))];
    let height = (area.height as usize).saturating_sub(1);
    let offset = (cursor + 1).saturating_sub(height);
    lines.extend(
        controller
            .picker()
            .entries
            .iter()
            .enumerate()
            .skip(offset)
            .take(height)
            .map(|(index, entry)| {
                let style = if index == cursor {
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
                } else if entry.context_only {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default().fg(Color::Gray)
                };
                let marker = if index == cursor { "▶ " } else { "  " };
                Line::from(vec![
                    Span::raw(format!(" {}{}", marker, "  ".repeat(entry.depth))),
                    Span::styled(entry.node.name.clone(), style),
                ])
            }),
    );
    f.render_widget(Paragraph::new(lines), area);
}

fn row(controller: &Controller, entry: &ViewEntry, selected: bool) -> Line<'static> {
    let node = &entry.node;
    let visibility = controller.config().visibility;
    let mut spans = Vec::new();

    let hotkey = controller
        .bindings()
        .hotkey_for(node.path.as_str())
        .map(|k| format!("[{}]", k))
        .unwrap_or_else(|| "   ".to_string());
    spans.push(Span::styled(
        format!(" {} ", hotkey),
        Style::default().fg(Color::Blue),
    ));

    if controller.is_running(&node.path) && !entry.placeholder {
        spans.push(Span::styled("● ", Style::default().fg(Color::Green)));
    } else {
        spans.push(Span::styled("○ ", Style::default().fg(Color::DarkGray)));
    }

    spans.push(Span::raw("  ".repeat(entry.depth)));
    spans.push(Span::styled(
        kind_marker(node.kind),
        Style::default().fg(Color::DarkGray),
    ));

    let name_style = if entry.context_only {
        Style::default().fg(Color::DarkGray)
    } else if selected {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else if node.is_ecosystem() {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default().fg(Color::White)
    };
    spans.push(Span::styled(
        display_name(node, controller.path_display(), controller.home()),
        name_style,
    ));

    if entry.placeholder {
        return finish(spans, selected);
    }

    let loading = |class| node.enrichment.is_loading(class);
    if visibility.git {
        spans.push(Span::raw("  "));
        spans.extend(git_spans(node, loading(EnrichmentClass::Git), spinner(controller)));
    }
    if visibility.agent {
        if let Some(agent) = &node.agent {
            spans.push(Span::raw("  "));
            spans.push(agent_span(agent.state, agent.duration_secs));
        }
    }
    if visibility.notes {
        if let Some(notes) = node.notes.as_ref().filter(|n| n.current + n.inbox > 0) {
            spans.push(Span::styled(
                format!("  ✎{}/{}", notes.current, notes.inbox),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    if visibility.plans {
        if let Some(plans) = node.plans.as_ref().filter(|p| p.total > 0) {
            spans.push(Span::styled(
                format!("  ☰{}/{}", plans.active, plans.total),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }
    if visibility.rules {
        if let Some(label) = node.rules.and_then(rule_label) {
            spans.push(Span::styled(
                format!("  {}", label),
                Style::default().fg(Color::Blue),
            ));
        }
    }
    finish(spans, selected)
}

fn finish(spans: Vec<Span<'static>>, selected: bool) -> Line<'static> {
    let line = Line::from(spans);
    if selected {
        line.style(Style::default().bg(Color::Rgb(40, 44, 52)))
    } else {
        line
    }
}

fn kind_marker(kind: ProjectKind) -> &'static str {
    match kind {
        ProjectKind::Ecosystem => "◆ ",
        ProjectKind::EcosystemWorktree => "◇ ",
        ProjectKind::RepositoryWorktree => "⎇ ",
        ProjectKind::Repository | ProjectKind::NonGroveClone => "",
    }
}

pub fn display_name(
    node: &WorkspaceNode,
    mode: PathDisplay,
    home: Option<&std::path::Path>,
) -> String {
    match mode {
        PathDisplay::Name => node.name.clone(),
        PathDisplay::Tilde => tilde_path(&node.path, home),
        PathDisplay::Full => node.path.clone(),
    }
}

fn git_spans(node: &WorkspaceNode, loading: bool, frame: &'static str) -> Vec<Span<'static>> {
    let Some(git) = &node.git else {
        return if loading {
            vec![Span::styled(frame, Style::default().fg(Color::DarkGray))]
        } else {
            Vec::new()
        };
    };

    let mut spans = Vec::new();
    if let Some(branch) = &git.branch {
        spans.push(Span::styled(
            branch.clone(),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if git.dirty {
        spans.push(Span::styled(" *", Style::default().fg(Color::Yellow)));
    }
    if git.ahead > 0 {
        spans.push(Span::styled(
            format!(" ↑{}", git.ahead),
            Style::default().fg(Color::Green),
        ));
    }
    if git.behind > 0 {
        spans.push(Span::styled(
            format!(" ↓{}", git.behind),
            Style::default().fg(Color::Red),
        ));
    }
    if git.lines_added + git.lines_deleted > 0 {
        spans.push(Span::styled(
            format!(" +{}", git.lines_added),
            Style::default().fg(Color::Green),
        ));
        spans.push(Span::styled(
            format!(" -{}", git.lines_deleted),
            Style::default().fg(Color::Red),
        ));
    }
    if loading {
        spans.push(Span::styled(
            format!(" {}", frame),
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans
}

fn agent_span(state: AgentState, duration_secs: u64) -> Span<'static> {
    let (icon, label, color) = match state {
        AgentState::Running => ("◐", "running", Color::Yellow),
        AgentState::Idle => ("○", "idle", Color::Gray),
        AgentState::Completed => ("●", "done", Color::Green),
        AgentState::Failed => ("✗", "failed", Color::Red),
    };
    Span::styled(
        format!("{} {} {}", icon, label, format_duration(duration_secs)),
        Style::default().fg(color),
    )
}

fn rule_label(status: RuleStatus) -> Option<&'static str> {
    match status {
        RuleStatus::None => None,
        RuleStatus::Hot => Some("hot"),
        RuleStatus::Cold => Some("cold"),
        RuleStatus::Excluded => Some("excl"),
    }
}

pub fn format_duration(secs: u64) -> String {
    let minutes = secs / 60;
    if minutes < 1 {
        format!("{}s", secs)
    } else if minutes < 60 {
        format!("{}m", minutes)
    } else {
        format!("{}h{:02}m", minutes / 60, minutes % 60)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Footer
// ─────────────────────────────────────────────────────────────────────────────

fn footer(controller: &Controller, now: Instant) -> Line<'static> {
    match controller.mode() {
        Mode::Filtering => Line::from(vec![
            Span::styled(" / ", Style::default().fg(Color::Cyan)),
            Span::styled(
                format!("{}▏", controller.filter()),
                Style::default().fg(Color::White),
            ),
            Span::styled(
                "   [Enter] Open  [Tab] Keep  [Esc] Clear",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Mode::Renaming { buffer, .. } => Line::from(vec![
            Span::styled(" Rename: ", Style::default().fg(Color::Cyan)),
            Span::styled(format!("{}▏", buffer), Style::default().fg(Color::White)),
            Span::styled(
                "   [Enter] Save  [Esc] Cancel",
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Mode::EditingHotkey { highlighted, .. } => hotkey_footer(controller, *highlighted),
        _ => match controller.status_text(now) {
            Some(msg) => Line::from(Span::styled(
                format!(" {}", msg),
                Style::default().fg(Color::Cyan),
            )),
            None if !controller.filter().is_empty() => Line::from(vec![
                Span::styled(
                    format!(" filter: {}", controller.filter()),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled("  [Esc] Clear", Style::default().fg(Color::DarkGray)),
            ]),
            None => default_footer(),
        },
    }
}

fn hotkey_footer(controller: &Controller, highlighted: usize) -> Line<'static> {
    let mut spans = vec![Span::styled(" Hotkey: ", Style::default().fg(Color::Cyan))];
    for (index, binding) in controller.bindings().bindings().iter().enumerate() {
        let style = if index == highlighted {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else if binding.is_available() {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(binding.hotkey.to_string(), style));
        spans.push(Span::raw(" "));
    }
    let owner = controller
        .bindings()
        .bindings()
        .get(highlighted)
        .and_then(|b| b.path.as_deref())
        .map(|p| format!(" (now {})", sessionizer_core::paths::base_name(p)))
        .unwrap_or_default();
    spans.push(Span::styled(owner, Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
        "  [Del] Clear  [Esc] Cancel",
        Style::default().fg(Color::DarkGray),
    ));
    Line::from(spans)
}

fn default_footer() -> Line<'static> {
    Line::from(vec![
        Span::styled(" [↑↓/jk]", Style::default().fg(Color::DarkGray)),
        Span::styled(" Nav ", Style::default().fg(Color::Gray)),
        Span::styled(" [Enter]", Style::default().fg(Color::DarkGray)),
        Span::styled(" Open ", Style::default().fg(Color::Gray)),
        Span::styled(" [/]", Style::default().fg(Color::DarkGray)),
        Span::styled(" Filter ", Style::default().fg(Color::Gray)),
        Span::styled(" [e]", Style::default().fg(Color::DarkGray)),
        Span::styled(" Hotkey ", Style::default().fg(Color::Gray)),
        Span::styled(" [f/F]", Style::default().fg(Color::DarkGray)),
        Span::styled(" Focus ", Style::default().fg(Color::Gray)),
        Span::styled(" [d]", Style::default().fg(Color::DarkGray)),
        Span::styled(" Dirty ", Style::default().fg(Color::Gray)),
        Span::styled(" [w]", Style::default().fg(Color::DarkGray)),
        Span::styled(" Fold ", Style::default().fg(Color::Gray)),
        Span::styled(" [R]", Style::default().fg(Color::DarkGray)),
        Span::styled(" Rescan ", Style::default().fg(Color::Gray)),
        Span::styled(" [q]", Style::default().fg(Color::DarkGray)),
        Span::styled(" Quit ", Style::default().fg(Color::Gray)),
    ])
}
