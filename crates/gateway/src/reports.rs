//! HTML report templates
//!
//! The PDF endpoints build these documents and hand them to the renderer.
//! All user-entered text is escaped before interpolation.

use siget_common::db::{RecordReportData, SessionReportData, SessionWithActivities};

const STYLE: &str = r#"
body { font-family: 'Helvetica Neue', Arial, sans-serif; margin: 2.5cm; color: #222; }
h1 { font-size: 18pt; border-bottom: 2px solid #444; padding-bottom: 6px; }
h2 { font-size: 13pt; margin-top: 24px; }
table { width: 100%; border-collapse: collapse; margin-top: 8px; }
th, td { border: 1px solid #999; padding: 6px 8px; text-align: left; font-size: 10pt; }
th { background: #eee; }
.meta { margin: 12px 0; font-size: 11pt; }
.meta span { display: inline-block; min-width: 140px; font-weight: bold; }
.notes { margin-top: 8px; font-style: italic; }
"#;

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn format_date(date: &chrono::DateTime<chrono::FixedOffset>) -> String {
    date.format("%d-%m-%Y").to_string()
}

fn activities_table(sessions: &SessionWithActivities) -> String {
    let mut rows = String::new();
    for activity in &sessions.activities {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(&activity.description),
            activity.rating
        ));
    }
    format!(
        "<table><thead><tr><th>Activity</th><th>Rating (1-5)</th></tr></thead><tbody>{}</tbody></table>",
        rows
    )
}

/// Single-session report document
pub fn session_report_html(data: &SessionReportData) -> String {
    let mut activity_rows = String::new();
    for activity in &data.activities {
        activity_rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>",
            escape(&activity.description),
            activity.rating
        ));
    }

    let notes = data
        .notes
        .as_deref()
        .map(|n| format!("<p class=\"notes\">{}</p>", escape(n)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>{style}</style></head>
<body>
<h1>Session Report</h1>
<div class="meta">
<p><span>Patient:</span> {patient} ({rut})</p>
<p><span>Professional:</span> {professional}</p>
<p><span>Session date:</span> {date}</p>
</div>
<h2>Activities</h2>
<table><thead><tr><th>Activity</th><th>Rating (1-5)</th></tr></thead><tbody>{rows}</tbody></table>
{notes}
</body></html>"#,
        style = STYLE,
        patient = escape(&data.patient_name),
        rut = escape(&data.patient_rut),
        professional = escape(&data.professional_name),
        date = format_date(&data.session_date),
        rows = activity_rows,
        notes = notes,
    )
}

/// Consolidated record report: the whole year's sessions in chronological
/// order
pub fn record_report_html(data: &RecordReportData) -> String {
    let mut body = String::new();
    for session in &data.sessions {
        body.push_str(&format!(
            "<h2>Session of {}</h2>",
            format_date(&session.session.session_date)
        ));
        if let Some(notes) = &session.session.notes {
            body.push_str(&format!("<p class=\"notes\">{}</p>", escape(notes)));
        }
        body.push_str(&activities_table(session));
    }

    let diagnosis = data
        .diagnosis
        .as_deref()
        .map(|d| format!("<p><span>Diagnosis:</span> {}</p>", escape(d)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"><style>{style}</style></head>
<body>
<h1>Consolidated Report {year}</h1>
<div class="meta">
<p><span>Patient:</span> {patient} ({rut})</p>
<p><span>Professional:</span> {professional}</p>
<p><span>Course:</span> {course}</p>
{diagnosis}
</div>
{body}
</body></html>"#,
        style = STYLE,
        year = data.year,
        patient = escape(&data.patient_name),
        rut = escape(&data.patient_rut),
        professional = escape(&data.professional_name),
        course = escape(&data.course),
        diagnosis = diagnosis,
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use siget_common::db::models::{Activity, Session};
    use uuid::Uuid;

    fn report() -> SessionReportData {
        SessionReportData {
            session_id: Uuid::new_v4(),
            session_date: "2025-06-10T15:00:00-04:00".parse().unwrap(),
            notes: Some("good progress <script>".into()),
            patient_name: "Martina Rojas".into(),
            patient_rut: "21.605.333-4".into(),
            professional_name: "Ana Pérez".into(),
            activities: vec![Activity {
                id: Uuid::new_v4(),
                session_id: Uuid::new_v4(),
                description: "memory & cards".into(),
                rating: 4,
            }],
        }
    }

    #[test]
    fn test_session_report_escapes_user_text() {
        let html = session_report_html(&report());
        assert!(html.contains("good progress &lt;script&gt;"));
        assert!(html.contains("memory &amp; cards"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_session_report_uses_day_first_dates() {
        let html = session_report_html(&report());
        assert!(html.contains("10-06-2025"));
    }

    #[test]
    fn test_record_report_lists_sessions_in_given_order() {
        let session = |date: &str| SessionWithActivities {
            session: Session {
                id: Uuid::new_v4(),
                record_id: Uuid::new_v4(),
                session_date: date.parse().unwrap(),
                notes: None,
                created_at: Utc::now().into(),
            },
            activities: vec![],
        };

        let data = RecordReportData {
            record_id: Uuid::new_v4(),
            year: 2025,
            course: "3B".into(),
            diagnosis: None,
            patient_name: "Martina Rojas".into(),
            patient_rut: "21.605.333-4".into(),
            professional_name: "Ana Pérez".into(),
            sessions: vec![
                session("2025-03-01T10:00:00-03:00"),
                session("2025-04-01T10:00:00-03:00"),
            ],
        };

        let html = record_report_html(&data);
        let first = html.find("01-03-2025").unwrap();
        let second = html.find("01-04-2025").unwrap();
        assert!(first < second);
    }
}
