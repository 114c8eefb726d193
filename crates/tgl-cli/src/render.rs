//! HTML preview of a day's compressed events.
//!
//! Renders a horizontal timeline: one colored bar per event, positioned by
//! its share of the rendered span, with a key, an hour ruler, and a hover
//! tooltip. Pure string construction so the output can be asserted on.

use std::fmt::Write;

use chrono::{Duration, NaiveTime, TimeZone, Timelike};
use tgl_core::Event;

/// Material palette, assigned to projects in first-appearance order.
const COLORS: [&str; 18] = [
    "#f44336", "#2196f3", "#4caf50", "#9c27b0", "#e91e63", "#673ab7", "#3f51b5", "#03a9f4",
    "#00bcd4", "#009688", "#8bc34a", "#cddc39", "#ffeb3b", "#ffc107", "#ff9800", "#ff5722",
    "#795548", "#607d8b",
];

const HTML_HEAD: &str = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta name="theme-color" content="#111111">
<title>tgl</title>
<style>
#container {
    display: inline-block;
    min-width: 100%;
    height: 1em;
    background: #9e9e9e;
    position: relative;
}
#hover {
    min-height: 200px;
}
#hours {
    position: relative;
    min-width: 100%;
    height: 1em;
}
.hour {
    position: absolute;
}
div {
    padding: 0;
    margin: 0;
}
.event {
    height: 1em;
    position: absolute;
}
.key-item {
    height: 1em;
    display: flex;
    flex-direction: row;
    padding: 4px 0;
}
.key-color {
    width: 1em;
}
.key-name {
    margin-left: 6px;
}
"##;

const HTML_FOOT: &str = r#"</div>
<div id="hover"></div>
<script>
function show(text) {
    document.getElementById('hover').innerHTML = text;
}
</script>
</body>
</html>
"#;

/// Renders the preview document for a list of compressed events.
///
/// The timeline spans from the first event's start to the end of the last
/// event. `tz` decides the wall-clock labels; the pipeline passes
/// [`chrono::Local`].
pub fn render_preview<Tz: TimeZone>(events: &[Event], tz: &Tz) -> String {
    let start = events.first().map_or(0, |event| event.start);
    let end = events.last().map_or(0, |event| event.start + event.duration);
    let span = (end - start).max(1);

    // Projects in first-appearance order; the index doubles as the CSS class.
    let mut projects: Vec<&str> = Vec::new();
    let mut bars = String::new();
    for event in events {
        let Some(project) = event.project.as_deref() else {
            continue;
        };
        let index = projects
            .iter()
            .position(|seen| *seen == project)
            .unwrap_or_else(|| {
                projects.push(project);
                projects.len() - 1
            });
        let left = percent(event.start - start, span);
        let width = percent(event.duration, span);
        let about = escape_html(&tooltip(event, tz));
        write!(
            bars,
            r#"<div class="event p{index}" style="left:{left:.2}%;width:{width:.2}%" onmouseover="show('{about}')"></div>"#
        )
        .unwrap();
    }

    let mut styles = String::new();
    let mut key = String::new();
    for (index, project) in projects.iter().enumerate() {
        let color = COLORS[index % COLORS.len()];
        write!(styles, ".p{index} {{background:{color};}}").unwrap();
        write!(
            key,
            r#"<div class="key-item"><div class="key-color p{index}"></div><div class="key-name">{}</div></div>"#,
            escape_html(project)
        )
        .unwrap();
    }

    let hours = hour_marks(start, end, span, tz);
    format!(
        "{HTML_HEAD}{styles}</style>\n</head>\n<body>\n\
         <header>{} -> {}<br/>{} events</header>\n\
         <div id=\"key\">{key}</div>\n\
         <div id=\"hours\">{hours}</div>\n\
         <div id=\"container\">\n{bars}\n{HTML_FOOT}",
        wall_datetime(start, tz),
        wall_datetime(end, tz),
        events.len(),
    )
}

/// One `|{hour}` marker per wall-clock hour across the rendered span.
fn hour_marks<Tz: TimeZone>(start: i64, end: i64, span: i64, tz: &Tz) -> String {
    let (Some(start_dt), Some(end_dt)) = (
        tz.timestamp_opt(start, 0).single(),
        tz.timestamp_opt(end, 0).single(),
    ) else {
        return String::new();
    };

    let start_hour = start_dt.hour();
    let mut end_hour = end_dt.hour() + 1;
    if end_hour < start_hour {
        end_hour += 24; // span crosses midnight
    }

    let base = start_dt.naive_local().date();
    let mut marks = String::new();
    for hour in start_hour..end_hour {
        let date = if hour > 23 {
            base + Duration::days(1)
        } else {
            base
        };
        let wall = date.and_time(NaiveTime::from_hms_opt(hour % 24, 0, 0).unwrap_or(NaiveTime::MIN));
        let Some(mark) = tz.from_local_datetime(&wall).single() else {
            continue;
        };
        let position = percent(mark.timestamp() - start, span);
        write!(
            marks,
            r#"<div class="hour" style="left:{position:.2}%;">|{}</div>"#,
            hour % 24
        )
        .unwrap();
    }
    marks
}

fn tooltip<Tz: TimeZone>(event: &Event, tz: &Tz) -> String {
    let project = sanitize(event.project.as_deref().unwrap_or(""));
    let description = sanitize(event.description.as_deref().unwrap_or(""));
    let tags = event
        .tags
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{project} - {description}: {} -> {} [{tags}]",
        wall_time(event.start, tz),
        wall_time(event.start + event.duration, tz),
    )
}

/// Backslashes (file paths in window titles) would end the tooltip's
/// attribute string early.
fn sanitize(raw: &str) -> String {
    raw.replace('\\', "/")
}

fn wall_time<Tz: TimeZone>(epoch: i64, tz: &Tz) -> String {
    tz.timestamp_opt(epoch, 0)
        .single()
        .map_or_else(String::new, |dt| {
            dt.naive_local().format("%H:%M").to_string()
        })
}

fn wall_datetime<Tz: TimeZone>(epoch: i64, tz: &Tz) -> String {
    tz.timestamp_opt(epoch, 0)
        .single()
        .map_or_else(String::new, |dt| {
            dt.naive_local().format("%Y-%m-%dT%H:%M:%S").to_string()
        })
}

#[allow(clippy::cast_precision_loss)]
fn percent(offset: i64, span: i64) -> f64 {
    offset as f64 / span as f64 * 100.0
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
