//! Terminal rendering for tasks, the dashboard, and account screens.

use chrono::NaiveDateTime;
use owo_colors::OwoColorize;
use smarttask_core::config::DisplayConfig;
use smarttask_core::format::{self, Tone};
use smarttask_core::model::*;
use smarttask_core::tasks::TaskOverview;

pub fn paint(text: &str, tone: Tone) -> String {
    match tone {
        Tone::Gray => text.bright_black().to_string(),
        Tone::Blue => text.blue().to_string(),
        Tone::Green => text.green().to_string(),
        Tone::Yellow => text.yellow().to_string(),
        Tone::Orange => text.truecolor(255, 140, 0).to_string(),
        Tone::Red => text.red().to_string(),
    }
}

pub fn status_badge(status: TaskStatus) -> String {
    paint(format::status_label(status), format::status_tone(status))
}

pub fn priority_badge(priority: TaskPriority) -> String {
    paint(format::priority_label(priority), format::priority_tone(priority))
}

/// One-line summary: id, status, priority, title, and due date (red when overdue).
pub fn task_line(task: &Task, display: &DisplayConfig, now: NaiveDateTime) -> String {
    let mut line = format!(
        "{:>5}  {:<14} {:<9} {}",
        format!("#{}", task.id).cyan(),
        status_badge(task.status),
        priority_badge(task.priority),
        task.title.bold()
    );
    if task.due_date.is_some() {
        let due = format::format_date(task.due_date, &display.date_format);
        if task.is_overdue_at(now) {
            line.push_str(&format!("  {}", format!("due {due} (overdue)").red()));
        } else {
            line.push_str(&format!("  {}", format!("due {due}").dimmed()));
        }
    }
    if task.subtask_count > 0 {
        line.push_str(&format!("  {}", format!("[{} subtasks]", task.subtask_count).dimmed()));
    }
    line
}

pub fn print_task_list(tasks: &[&Task], display: &DisplayConfig, now: NaiveDateTime) {
    if tasks.is_empty() {
        println!("{}", "No tasks found.".dimmed());
        return;
    }
    for task in tasks {
        println!("{}", task_line(task, display, now));
    }
    println!();
    println!("{}", format::task_count(tasks.len()).dimmed());
}

pub fn print_task_detail(task: &Task, display: &DisplayConfig, now: NaiveDateTime) {
    println!("{}", task.title.bold());
    println!(
        "{} {}",
        status_badge(task.status),
        priority_badge(task.priority)
    );
    println!();

    if let Some(description) = task.description.as_deref().filter(|d| !d.trim().is_empty()) {
        println!("{description}");
        println!();
    }

    println!("{}", "--- Details ---".dimmed());
    println!("  {}  {}", "ID:".dimmed(), task.id.to_string().cyan());
    if task.due_date.is_some() {
        let due = format::format_date(task.due_date, &display.datetime_format);
        let due = if task.is_overdue_at(now) {
            format!("{} {}", due.red(), "(overdue)".red())
        } else {
            due
        };
        println!("  {}  {}", "Due:".dimmed(), due);
    }
    if let Some(hours) = task.estimated_hours {
        println!("  {}  {hours}h", "Estimate:".dimmed());
    }
    if let Some(hours) = task.actual_hours {
        println!("  {}  {hours}h", "Spent:".dimmed());
    }
    if !task.tags.is_empty() {
        println!("  {}  {}", "Tags:".dimmed(), task.tags.join(", ").cyan());
    }
    if let Some(parent) = task.parent_task_id {
        println!("  {}  #{parent}", "Parent:".dimmed());
    }
    if task.subtask_count > 0 {
        println!("  {}  {}", "Subtasks:".dimmed(), task.subtask_count);
    }
    println!(
        "  {}  {}",
        "Created:".dimmed(),
        format::format_date(Some(task.created_at), &display.datetime_format)
    );
    println!(
        "  {}  {}",
        "Updated:".dimmed(),
        format::format_date(Some(task.updated_at), &display.datetime_format)
    );
    if task.completed_at.is_some() {
        println!(
            "  {}  {}",
            "Completed:".dimmed(),
            format::format_date(task.completed_at, &display.datetime_format)
        );
    }

    if let Some(analysis) = task.ai_analysis.as_deref().filter(|a| !a.trim().is_empty()) {
        println!();
        println!("{}", "--- AI analysis ---".dimmed());
        println!("{analysis}");
    }
}

pub fn print_overview(overview: &TaskOverview) {
    println!("{}", "Dashboard".bold());
    println!();
    println!("  {:<14} {}", "Total:".dimmed(), overview.total.to_string().bold());
    println!(
        "  {:<14} {}",
        format!("{}:", format::status_label(TaskStatus::Todo)).dimmed(),
        paint(&overview.todo.to_string(), Tone::Gray)
    );
    println!(
        "  {:<14} {}",
        format!("{}:", format::status_label(TaskStatus::InProgress)).dimmed(),
        paint(&overview.in_progress.to_string(), Tone::Blue)
    );
    println!(
        "  {:<14} {}",
        format!("{}:", format::status_label(TaskStatus::Completed)).dimmed(),
        paint(&overview.completed.to_string(), Tone::Green)
    );
    let overdue_tone = if overview.overdue > 0 { Tone::Red } else { Tone::Gray };
    println!(
        "  {:<14} {}",
        "Atrasadas:".dimmed(),
        paint(&overview.overdue.to_string(), overdue_tone)
    );
}

pub fn print_analysis(analysis: &AiAnalysisResponse) {
    if !analysis.summary.is_empty() {
        println!("{}", analysis.summary.bold());
        println!();
    }
    if let Some(priority) = analysis.suggested_priority {
        println!("  {}  {}", "Priority:".dimmed(), priority_badge(priority));
    }
    if let Some(hours) = analysis.estimated_hours {
        println!("  {}  {hours}h", "Estimate:".dimmed());
    }
    if !analysis.suggested_tags.is_empty() {
        println!(
            "  {}  {}",
            "Tags:".dimmed(),
            analysis.suggested_tags.join(", ").cyan()
        );
    }
    if !analysis.suggested_subtasks.is_empty() {
        println!();
        println!("{}", "--- Suggested subtasks ---".dimmed());
        for subtask in &analysis.suggested_subtasks {
            println!("  - {subtask}");
        }
    }
    if !analysis.analysis.is_empty() {
        println!();
        println!("{}", analysis.analysis);
    }
}

pub fn print_user(user: &User) {
    println!("{}", user.display_name().bold());
    println!("  {}  {}", "Username:".dimmed(), user.username);
    println!("  {}  {}", "Email:".dimmed(), user.email);
    if !user.roles.is_empty() {
        println!("  {}  {}", "Roles:".dimmed(), user.roles.join(", "));
    }
}

pub fn print_preferences(prefs: &NotificationPreferenceRequest) {
    let on_off = |flag: bool| {
        if flag {
            paint("on", Tone::Green)
        } else {
            paint("off", Tone::Gray)
        }
    };
    println!("{}", "WhatsApp notifications".bold());
    let number = if prefs.whatsapp_number.is_empty() {
        paint("not set", Tone::Yellow)
    } else {
        prefs.whatsapp_number.clone()
    };
    println!("  {:<20} {}", "Number:".dimmed(), number);
    println!("  {:<20} {}", "Enabled:".dimmed(), on_off(prefs.enabled));
    println!(
        "  {:<20} {}",
        "Daily reminder:".dimmed(),
        prefs.daily_reminder_time
    );
    println!("  {:<20} {}", "Timezone:".dimmed(), prefs.timezone);
    println!(
        "  {:<20} {}",
        "Overdue alerts:".dimmed(),
        on_off(prefs.send_overdue_alerts)
    );
    println!(
        "  {:<20} {}",
        "Completion summary:".dimmed(),
        on_off(prefs.send_completion_summary)
    );
}

pub fn print_settings(settings: &SettingsResponse) {
    let configured = |flag: bool| {
        if flag {
            paint("configured", Tone::Green)
        } else {
            paint("not configured", Tone::Red)
        }
    };
    println!("{}", "Integrations".bold());
    println!(
        "  {:<18} {}",
        "OpenAI:".dimmed(),
        configured(settings.openai_configured)
    );
    println!(
        "  {:<18} {}",
        "Twilio:".dimmed(),
        configured(settings.twilio_configured)
    );
    if let Some(number) = &settings.twilio_whatsapp_number {
        println!("  {:<18} {number}", "Twilio number:".dimmed());
    }
    if let Some(number) = &settings.user_whatsapp_number {
        println!("  {:<18} {number}", "Your number:".dimmed());
    }
    if let Some(message) = settings.message.as_deref().filter(|m| !m.is_empty()) {
        println!();
        println!("{}", message.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smarttask_core::model::timestamp;

    fn task(due: Option<&str>, status: TaskStatus) -> Task {
        Task {
            id: 42,
            title: "Ship release".into(),
            description: None,
            status,
            priority: TaskPriority::High,
            due_date: due.and_then(timestamp::parse),
            completed_at: None,
            estimated_hours: None,
            actual_hours: None,
            tags: vec![],
            parent_task_id: None,
            subtask_count: 0,
            ai_suggested_priority: None,
            ai_analysis: None,
            created_at: timestamp::parse("2024-03-01T09:00:00").unwrap(),
            updated_at: timestamp::parse("2024-03-01T09:00:00").unwrap(),
        }
    }

    #[test]
    fn test_task_line_marks_overdue() {
        let now = timestamp::parse("2024-03-10T12:00:00").unwrap();
        let display = DisplayConfig::default();
        let line = task_line(&task(Some("2024-03-05T18:00:00"), TaskStatus::Todo), &display, now);
        assert!(line.contains("#42"));
        assert!(line.contains("Ship release"));
        assert!(line.contains("A Fazer"));
        assert!(line.contains("Alta"));
        assert!(line.contains("due 05/03/2024 (overdue)"));
    }

    #[test]
    fn test_task_line_completed_is_not_overdue() {
        let now = timestamp::parse("2024-03-10T12:00:00").unwrap();
        let display = DisplayConfig::default();
        let line = task_line(
            &task(Some("2024-03-05T18:00:00"), TaskStatus::Completed),
            &display,
            now,
        );
        assert!(line.contains("due 05/03/2024"));
        assert!(!line.contains("overdue"));
    }

    #[test]
    fn test_task_line_without_due_date() {
        let now = timestamp::parse("2024-03-10T12:00:00").unwrap();
        let line = task_line(&task(None, TaskStatus::InProgress), &DisplayConfig::default(), now);
        assert!(!line.contains("due"));
        assert!(line.contains("Em Progresso"));
    }

    #[test]
    fn test_paint_keeps_text() {
        for tone in [Tone::Gray, Tone::Blue, Tone::Green, Tone::Yellow, Tone::Orange, Tone::Red] {
            assert!(paint("label", tone).contains("label"));
        }
    }
}
