use std::fmt::Write;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::models::{TechnicianRecord, TimeEntryKind, TimeEntryRecord};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DaySummary {
    pub total_minutes: i64,
    pub worked_minutes: i64,
    pub break_minutes: i64,
    pub total_hours: String,
}

/// Fixed label table for the attendance report; unrecognized stored
/// values are echoed back rather than rejected.
pub fn entry_label(kind: &TimeEntryKind) -> &str {
    match kind {
        TimeEntryKind::StartDay => "Inizio giornata",
        TimeEntryKind::StartBreak => "Inizio pausa",
        TimeEntryKind::EndBreak => "Fine pausa",
        TimeEntryKind::EndDay => "Fine giornata",
        TimeEntryKind::Other(raw) => raw,
    }
}

/// Worked/break totals for one technician-day. Each start_break pairs
/// with the next end_break; without both a start_day and an end_day the
/// totals stay at zero. Malformed sequences are tolerated here, see
/// [`validate_sequence`] for the diagnostic pass.
pub fn summarize_entries(entries: &[TimeEntryRecord]) -> DaySummary {
    let mut start_day: Option<DateTime<Utc>> = None;
    let mut end_day: Option<DateTime<Utc>> = None;
    let mut break_start: Option<DateTime<Utc>> = None;
    let mut break_seconds: i64 = 0;

    for entry in entries {
        match entry.kind {
            TimeEntryKind::StartDay => start_day = Some(entry.recorded_at),
            TimeEntryKind::EndDay => end_day = Some(entry.recorded_at),
            TimeEntryKind::StartBreak => break_start = Some(entry.recorded_at),
            TimeEntryKind::EndBreak => {
                if let Some(started) = break_start.take() {
                    break_seconds += (entry.recorded_at - started).num_seconds();
                }
            }
            TimeEntryKind::Other(_) => {}
        }
    }

    let mut total_minutes = 0;
    let mut worked_minutes = 0;
    let break_minutes = round_minutes(break_seconds);

    if let (Some(start), Some(end)) = (start_day, end_day) {
        let total_seconds = (end - start).num_seconds();
        total_minutes = round_minutes(total_seconds);
        worked_minutes = round_minutes(total_seconds - break_seconds);
    }

    DaySummary {
        total_minutes,
        worked_minutes,
        break_minutes,
        total_hours: format!("{:.2}", worked_minutes as f64 / 60.0),
    }
}

fn round_minutes(seconds: i64) -> i64 {
    (seconds as f64 / 60.0).round() as i64
}

/// Checks the start/break/end ordering of a technician-day. Returns
/// human-readable anomalies; callers log them and render anyway.
pub fn validate_sequence(entries: &[TimeEntryRecord]) -> Vec<String> {
    let mut anomalies = Vec::new();
    let mut start_day: Option<DateTime<Utc>> = None;
    let mut end_day: Option<DateTime<Utc>> = None;
    let mut open_break = false;

    if let Some(first) = entries.first() {
        if entries.iter().any(|e| e.entry_date != first.entry_date) {
            anomalies.push("timbrature su date diverse".to_string());
        }
        if entries.iter().any(|e| e.technician_id != first.technician_id) {
            anomalies.push("timbrature di tecnici diversi".to_string());
        }
    }

    for entry in entries {
        match entry.kind {
            TimeEntryKind::StartDay => {
                if start_day.is_some() {
                    anomalies.push("inizio giornata timbrato più volte".to_string());
                }
                start_day = Some(entry.recorded_at);
            }
            TimeEntryKind::EndDay => {
                if end_day.is_some() {
                    anomalies.push("fine giornata timbrata più volte".to_string());
                }
                end_day = Some(entry.recorded_at);
            }
            TimeEntryKind::StartBreak => {
                if open_break {
                    anomalies.push("inizio pausa senza fine pausa precedente".to_string());
                }
                open_break = true;
            }
            TimeEntryKind::EndBreak => {
                if !open_break {
                    anomalies.push("fine pausa senza inizio pausa".to_string());
                }
                open_break = false;
            }
            TimeEntryKind::Other(ref raw) => {
                anomalies.push(format!("timbratura di tipo sconosciuto: {raw}"));
            }
        }
    }

    if open_break {
        anomalies.push("pausa mai chiusa".to_string());
    }
    if let (Some(start), Some(end)) = (start_day, end_day) {
        if end < start {
            anomalies.push("fine giornata precedente all'inizio giornata".to_string());
        }
    }
    if start_day.is_none() && !entries.is_empty() {
        anomalies.push("nessun inizio giornata registrato".to_string());
    }

    anomalies
}

const WEEKDAYS_IT: [&str; 7] = [
    "lunedì",
    "martedì",
    "mercoledì",
    "giovedì",
    "venerdì",
    "sabato",
    "domenica",
];

pub(crate) const MONTHS_IT: [&str; 12] = [
    "gennaio",
    "febbraio",
    "marzo",
    "aprile",
    "maggio",
    "giugno",
    "luglio",
    "agosto",
    "settembre",
    "ottobre",
    "novembre",
    "dicembre",
];

fn long_date_it(date: NaiveDate) -> String {
    format!(
        "{} {} {} {}",
        WEEKDAYS_IT[date.weekday().num_days_from_monday() as usize],
        date.day(),
        MONTHS_IT[date.month0() as usize],
        date.year()
    )
}

fn format_minutes(minutes: i64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// Renders the daily attendance report as a self-contained HTML page
/// ready for print or PDF conversion. Pure templating: no I/O.
pub fn render_timesheet_html(
    technician: &TechnicianRecord,
    date: NaiveDate,
    entries: &[TimeEntryRecord],
    summary: &DaySummary,
) -> String {
    let mut html = String::new();
    let date_long = long_date_it(date);
    let date_short = date.format("%d/%m/%Y");

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="it">
<head>
<meta charset="UTF-8">
<title>Report Timbrature - {name} - {date_long}</title>
<style>
  body {{ font-family: 'Segoe UI', Tahoma, sans-serif; background: #f5f5f5; padding: 20px; }}
  .container {{ max-width: 800px; margin: 0 auto; background: white; padding: 40px; border-radius: 8px; }}
  .header {{ border-bottom: 3px solid #0a7ea4; padding-bottom: 20px; margin-bottom: 30px; }}
  .header h1 {{ color: #11181C; font-size: 28px; }}
  .subtitle {{ color: #687076; font-size: 16px; }}
  .info-box {{ background: #f5f5f5; padding: 16px; border-left: 4px solid #0a7ea4; margin-bottom: 12px; }}
  .info-box .label {{ color: #687076; font-size: 12px; text-transform: uppercase; }}
  .info-box .value {{ color: #11181C; font-size: 20px; font-weight: 600; }}
  .summary {{ background: #E6F4FE; padding: 24px; border-radius: 8px; margin-bottom: 30px; }}
  .summary-item {{ display: inline-block; margin-right: 32px; }}
  .summary-item .label {{ color: #687076; font-size: 13px; }}
  .summary-item .value {{ color: #0a7ea4; font-size: 24px; font-weight: 700; }}
  .entry {{ border: 1px solid #E5E7EB; border-radius: 8px; padding: 16px; margin-bottom: 12px; }}
  .entry-type {{ color: #11181C; font-size: 16px; font-weight: 600; }}
  .entry-time {{ color: #687076; font-size: 14px; }}
  .entry-location {{ display: inline-block; margin-top: 8px; padding: 4px 8px; border-radius: 4px; font-size: 12px; }}
  .in-sede {{ background: #D1FAE5; color: #22C55E; }}
  .fuori-sede {{ background: #FEF3C7; color: #F59E0B; }}
  .entry-reason {{ color: #687076; font-size: 13px; font-style: italic; }}
  .empty {{ color: #687076; font-style: italic; }}
  .footer {{ margin-top: 40px; border-top: 1px solid #E5E7EB; padding-top: 20px; color: #687076; font-size: 12px; text-align: center; }}
  @media print {{ body {{ background: white; padding: 0; }} .container {{ padding: 20px; }} }}
</style>
</head>
<body>
<div class="container">
  <div class="header">
    <h1>Report Timbrature Giornaliero</h1>
    <div class="subtitle">{date_long}</div>
  </div>
  <div class="info-box">
    <div class="label">Tecnico</div>
    <div class="value">{name}</div>
  </div>
  <div class="info-box">
    <div class="label">Data</div>
    <div class="value">{date_short}</div>
  </div>
  <div class="summary">
    <h2>Riepilogo Ore</h2>
    <div class="summary-item"><div class="label">Ore Totali</div><div class="value">{total_hours}h</div></div>
    <div class="summary-item"><div class="label">Ore Lavorate</div><div class="value">{worked}</div></div>
    <div class="summary-item"><div class="label">Pause</div><div class="value">{breaks}</div></div>
  </div>
  <h2>Timbrature</h2>
"#,
        name = technician.full_name,
        total_hours = summary.total_hours,
        worked = format_minutes(summary.worked_minutes),
        breaks = format_minutes(summary.break_minutes),
    );

    if entries.is_empty() {
        let _ = writeln!(
            html,
            r#"  <p class="empty">Nessuna timbratura registrata per questa giornata.</p>"#
        );
    } else {
        for entry in entries {
            let _ = writeln!(html, r#"  <div class="entry">"#);
            let _ = writeln!(
                html,
                r#"    <div class="entry-type">{}</div>"#,
                entry_label(&entry.kind)
            );
            let _ = writeln!(
                html,
                r#"    <div class="entry-time">{}</div>"#,
                entry.recorded_at.format("%H:%M")
            );
            if entry.is_remote {
                let _ = writeln!(
                    html,
                    r#"    <span class="entry-location fuori-sede">Fuori sede</span>"#
                );
                if let Some(reason) = &entry.remote_reason {
                    let _ = writeln!(html, r#"    <div class="entry-reason">{reason}</div>"#);
                }
            } else {
                let _ = writeln!(
                    html,
                    r#"    <span class="entry-location in-sede">In sede</span>"#
                );
            }
            let _ = writeln!(html, "  </div>");
        }
    }

    let _ = write!(
        html,
        r#"  <div class="footer">Documento generato automaticamente</div>
</div>
</body>
</html>
"#
    );

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn technician() -> TechnicianRecord {
        TechnicianRecord {
            id: Uuid::new_v4(),
            full_name: "Marco Bianchi".to_string(),
            email: "marco.bianchi@example.com".to_string(),
            push_token: None,
        }
    }

    fn entry(kind: TimeEntryKind, hour: u32, minute: u32) -> TimeEntryRecord {
        TimeEntryRecord {
            id: Uuid::new_v4(),
            technician_id: Uuid::from_u128(42),
            entry_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            kind,
            recorded_at: Utc.with_ymd_and_hms(2026, 3, 9, hour, minute, 0).unwrap(),
            latitude: None,
            longitude: None,
            is_remote: false,
            remote_reason: None,
        }
    }

    #[test]
    fn full_day_with_break() {
        let entries = vec![
            entry(TimeEntryKind::StartDay, 8, 0),
            entry(TimeEntryKind::StartBreak, 12, 0),
            entry(TimeEntryKind::EndBreak, 12, 30),
            entry(TimeEntryKind::EndDay, 17, 0),
        ];
        let summary = summarize_entries(&entries);
        assert_eq!(summary.total_minutes, 540);
        assert_eq!(summary.break_minutes, 30);
        assert_eq!(summary.worked_minutes, 510);
        assert_eq!(summary.total_hours, "8.50");
    }

    #[test]
    fn open_day_has_zero_totals() {
        let entries = vec![entry(TimeEntryKind::StartDay, 8, 0)];
        let summary = summarize_entries(&entries);
        assert_eq!(summary.total_minutes, 0);
        assert_eq!(summary.worked_minutes, 0);
        assert_eq!(summary.total_hours, "0.00");
    }

    #[test]
    fn unmatched_end_break_is_ignored_in_totals() {
        let entries = vec![
            entry(TimeEntryKind::StartDay, 8, 0),
            entry(TimeEntryKind::EndBreak, 12, 30),
            entry(TimeEntryKind::EndDay, 16, 0),
        ];
        let summary = summarize_entries(&entries);
        assert_eq!(summary.break_minutes, 0);
        assert_eq!(summary.worked_minutes, 480);
    }

    #[test]
    fn labels_map_the_four_kinds() {
        assert_eq!(entry_label(&TimeEntryKind::StartDay), "Inizio giornata");
        assert_eq!(entry_label(&TimeEntryKind::StartBreak), "Inizio pausa");
        assert_eq!(entry_label(&TimeEntryKind::EndBreak), "Fine pausa");
        assert_eq!(entry_label(&TimeEntryKind::EndDay), "Fine giornata");
    }

    #[test]
    fn unknown_kind_echoes_raw_value() {
        let kind = TimeEntryKind::parse("badge_swipe");
        assert_eq!(entry_label(&kind), "badge_swipe");
    }

    #[test]
    fn well_formed_sequence_has_no_anomalies() {
        let entries = vec![
            entry(TimeEntryKind::StartDay, 8, 0),
            entry(TimeEntryKind::StartBreak, 12, 0),
            entry(TimeEntryKind::EndBreak, 12, 30),
            entry(TimeEntryKind::EndDay, 17, 0),
        ];
        assert!(validate_sequence(&entries).is_empty());
    }

    #[test]
    fn sequence_anomalies_are_reported() {
        let entries = vec![
            entry(TimeEntryKind::EndDay, 7, 0),
            entry(TimeEntryKind::StartDay, 8, 0),
            entry(TimeEntryKind::StartBreak, 12, 0),
        ];
        let anomalies = validate_sequence(&entries);
        assert!(anomalies.iter().any(|a| a.contains("pausa mai chiusa")));
        assert!(anomalies
            .iter()
            .any(|a| a.contains("fine giornata precedente")));
    }

    #[test]
    fn empty_sequence_is_valid() {
        assert!(validate_sequence(&[]).is_empty());
    }

    #[test]
    fn zero_entries_render_placeholder() {
        let summary = summarize_entries(&[]);
        let html = render_timesheet_html(
            &technician(),
            NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            &[],
            &summary,
        );
        assert!(html.contains("Nessuna timbratura registrata"));
        assert!(!html.contains(r#"<div class="entry">"#));
    }

    #[test]
    fn report_includes_entries_and_header() {
        let entries = vec![
            entry(TimeEntryKind::StartDay, 8, 0),
            entry(TimeEntryKind::EndDay, 17, 0),
        ];
        let summary = summarize_entries(&entries);
        let html = render_timesheet_html(
            &technician(),
            NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            &entries,
            &summary,
        );
        assert!(html.contains("Marco Bianchi"));
        assert!(html.contains("lunedì 9 marzo 2026"));
        assert!(html.contains("Inizio giornata"));
        assert!(html.contains("Fine giornata"));
        assert!(html.contains("In sede"));
    }

    #[test]
    fn remote_entry_shows_reason() {
        let mut remote = entry(TimeEntryKind::StartDay, 8, 0);
        remote.is_remote = true;
        remote.remote_reason = Some("Cantiere fuori città".to_string());
        let entries = vec![remote];
        let summary = summarize_entries(&entries);
        let html = render_timesheet_html(
            &technician(),
            NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            &entries,
            &summary,
        );
        assert!(html.contains("Fuori sede"));
        assert!(html.contains("Cantiere fuori città"));
    }
}
