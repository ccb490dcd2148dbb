//! Presentation lookups shared by front ends: labels, colour tones, dates.

use chrono::NaiveDateTime;

use crate::model::{TaskPriority, TaskStatus};

/// Colour family a front end should use for a badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Gray,
    Blue,
    Green,
    Yellow,
    Orange,
    Red,
}

pub fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Todo => "A Fazer",
        TaskStatus::InProgress => "Em Progresso",
        TaskStatus::Completed => "Concluída",
        TaskStatus::Cancelled => "Cancelada",
    }
}

pub fn priority_label(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "Baixa",
        TaskPriority::Medium => "Média",
        TaskPriority::High => "Alta",
        TaskPriority::Urgent => "Urgente",
    }
}

pub fn status_tone(status: TaskStatus) -> Tone {
    match status {
        TaskStatus::Todo => Tone::Gray,
        TaskStatus::InProgress => Tone::Blue,
        TaskStatus::Completed => Tone::Green,
        TaskStatus::Cancelled => Tone::Red,
    }
}

pub fn priority_tone(priority: TaskPriority) -> Tone {
    match priority {
        TaskPriority::Low => Tone::Green,
        TaskPriority::Medium => Tone::Yellow,
        TaskPriority::High => Tone::Orange,
        TaskPriority::Urgent => Tone::Red,
    }
}

/// Format an optional timestamp; `None` renders as an empty string.
pub fn format_date(dt: Option<NaiveDateTime>, pattern: &str) -> String {
    dt.map(|d| d.format(pattern).to_string()).unwrap_or_default()
}

/// `true` when `due` is strictly before `now`. No due date is never overdue.
pub fn is_overdue(due: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    due.is_some_and(|d| d < now)
}

/// Pluralized count, e.g. "1 tarefa" / "3 tarefas".
pub fn task_count(n: usize) -> String {
    if n == 1 {
        "1 tarefa".to_string()
    } else {
        format!("{n} tarefas")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::timestamp;

    #[test]
    fn test_labels() {
        assert_eq!(status_label(TaskStatus::InProgress), "Em Progresso");
        assert_eq!(priority_label(TaskPriority::Urgent), "Urgente");
    }

    #[test]
    fn test_tones() {
        assert_eq!(status_tone(TaskStatus::Completed), Tone::Green);
        assert_eq!(priority_tone(TaskPriority::High), Tone::Orange);
    }

    #[test]
    fn test_format_date() {
        let dt = timestamp::parse("2024-03-05T14:07:00");
        assert_eq!(format_date(dt, "%d/%m/%Y"), "05/03/2024");
        assert_eq!(format_date(dt, "%d/%m/%Y %H:%M"), "05/03/2024 14:07");
        assert_eq!(format_date(None, "%d/%m/%Y"), "");
    }

    #[test]
    fn test_is_overdue() {
        let now = timestamp::parse("2024-03-05T12:00:00").unwrap();
        assert!(is_overdue(timestamp::parse("2024-03-05T11:59:00"), now));
        assert!(!is_overdue(timestamp::parse("2024-03-05T12:00:00"), now));
        assert!(!is_overdue(None, now));
    }

    #[test]
    fn test_task_count() {
        assert_eq!(task_count(1), "1 tarefa");
        assert_eq!(task_count(0), "0 tarefas");
    }
}
