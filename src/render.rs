//! Message rendering for notification channels.
//!
//! One event renders into any of four text dialects: plain text for email
//! and Slack, Markdown for Telegram, HTML for bot APIs that prefer it, and
//! ANSI-colored text for the console. All formats apply the same composition
//! rules; only escaping and decoration differ. The `Renderer` is immutable
//! and constructed once at startup, then shared by every channel adapter.

use crate::core::Event;

/// The text dialect a channel adapter requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Plain,
    Markdown,
    Html,
    Ansi,
}

/// Fixed palette of ANSI escape sequences used by the console format.
#[derive(Debug, Clone)]
pub struct AnsiPalette {
    pub red: &'static str,
    pub green: &'static str,
    pub yellow: &'static str,
    pub blue: &'static str,
    pub magenta: &'static str,
    pub cyan: &'static str,
    pub gray: &'static str,
    pub white: &'static str,
    pub reset: &'static str,
}

impl Default for AnsiPalette {
    fn default() -> Self {
        Self {
            red: "\x1b[31m",
            green: "\x1b[32m",
            yellow: "\x1b[33m",
            blue: "\x1b[34m",
            magenta: "\x1b[35m",
            cyan: "\x1b[36m",
            gray: "\x1b[37m",
            white: "\x1b[97m",
            reset: "\x1b[0m",
        }
    }
}

/// Human description for well-known container exit codes.
///
/// Codes 125-128 are reserved by the Docker engine, 128+n are fatal-signal
/// exits. Unmapped codes return the empty string and render no description.
pub fn exit_code_description(code: &str) -> &'static str {
    match code {
        "0" => "Success",
        "1" => "Application error",
        "2" => "Misuse of builtin",
        "125" => "Container failed to run",
        "126" => "Container command cannot be invoked",
        "127" => "Container command cannot be found",
        "128" => "Invalid argument used on exit",
        "134" => "Abnormal termination SIGABRT",
        "137" => "Immediate termination SIGKILL",
        "139" => "Segmentation Fault SIGSEGV",
        "143" => "Graceful termination SIGTERM",
        "255" => "Exit status out of range",
        _ => "",
    }
}

/// Maps daemon action strings to the verb shown to humans.
pub fn action_name(action: &str) -> &str {
    match action {
        "die" => "stop",
        "health_status: healthy" => "healthy",
        "health_status: unhealthy" => "unhealthy",
        other => other,
    }
}

/// Renders a duration-in-seconds label like `65` as `1m5s`.
///
/// Values that do not parse as whole seconds fall back to `<raw>s`.
fn human_duration(raw: &str) -> String {
    let Ok(total) = raw.parse::<u64>() else {
        return format!("{raw}s");
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{m}m{s}s")
    } else {
        format!("{s}s")
    }
}

/// Escapes the Markdown characters Telegram treats as markup.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '_' | '*' | '`' | '[' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Escapes the HTML entities bot APIs require inside tags.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wraps a value in inline-code backticks; inner backticks become quotes so
/// the span cannot be broken out of.
fn wrap_code(text: &str) -> String {
    format!("`{}`", text.replace('`', "'"))
}

/// Immutable message renderer shared by all channel adapters.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    palette: AnsiPalette,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders one event in the requested dialect.
    ///
    /// Rendering is deterministic: the same event and format always produce
    /// byte-identical output. An event carrying an override `message` is
    /// returned as-is in every format (Markdown escapes its reserved
    /// characters so the override cannot inject markup).
    pub fn render(&self, event: &Event, format: RenderFormat) -> String {
        match format {
            RenderFormat::Plain => self.plain(event),
            RenderFormat::Markdown => self.markdown(event),
            RenderFormat::Html => self.html(event),
            RenderFormat::Ansi => self.ansi(event),
        }
    }

    fn plain(&self, event: &Event) -> String {
        if let Some(message) = &event.message {
            return message.clone();
        }

        let mut out = format!(
            "{} {} {} ({})",
            event.kind,
            action_name(&event.action),
            event.name,
            event.image
        );
        if !event.exec_duration.is_empty() {
            out.push_str(&format!(" (after {})", human_duration(&event.exec_duration)));
        }
        if !event.project.is_empty() && !event.service.is_empty() {
            out.push_str(&format!(" {}::{}", event.project, event.service));
        }
        if !event.exit_code.is_empty() {
            out.push_str(&format!(" Exit code: {}", event.exit_code));
            let details = exit_code_description(&event.exit_code);
            if !details.is_empty() {
                out.push_str(&format!(" \"{details}\""));
            }
        }
        out
    }

    fn markdown(&self, event: &Event) -> String {
        if let Some(message) = &event.message {
            return escape_markdown(message);
        }

        let mut out = format!(
            "{} *{}* {} ({})",
            event.kind,
            action_name(&event.action),
            wrap_code(&event.name),
            wrap_code(&event.image)
        );
        if !event.exec_duration.is_empty() {
            out.push_str(&format!(" (after {})", human_duration(&event.exec_duration)));
        }
        if !event.project.is_empty() && !event.service.is_empty() {
            out.push_str(&format!(
                " {}::{}",
                wrap_code(&event.project),
                wrap_code(&event.service)
            ));
        }
        if !event.exit_code.is_empty() {
            out.push_str(&format!(" Exit code: {}", wrap_code(&event.exit_code)));
            let details = exit_code_description(&event.exit_code);
            if !details.is_empty() {
                out.push_str(&format!(" \"_{details}_\""));
            }
        }
        out
    }

    fn html(&self, event: &Event) -> String {
        if let Some(message) = &event.message {
            return message.clone();
        }

        let mut out = format!(
            "{} <b>{}</b> <code>{}</code> (<code>{}</code>)",
            event.kind,
            action_name(&event.action),
            escape_html(&event.name),
            escape_html(&event.image)
        );
        if !event.exec_duration.is_empty() {
            out.push_str(&format!(
                " (after <u>{}</u>)",
                human_duration(&event.exec_duration)
            ));
        }
        if !event.project.is_empty() && !event.service.is_empty() {
            out.push_str(&format!(
                " <code>{}</code>::<code>{}</code>",
                escape_html(&event.project),
                escape_html(&event.service)
            ));
        }
        if !event.exit_code.is_empty() {
            out.push_str(&format!(" Exit code: <code>{}</code>", event.exit_code));
            let details = exit_code_description(&event.exit_code);
            if !details.is_empty() {
                out.push_str(&format!(" \"<i>{}</i>\"", escape_html(details)));
            }
        }
        out
    }

    fn ansi(&self, event: &Event) -> String {
        if let Some(message) = &event.message {
            return message.clone();
        }

        let p = &self.palette;
        let mut out = format!(
            "{} {}{}{} {}{}{} {}({}){}",
            event.kind,
            p.yellow,
            action_name(&event.action),
            p.reset,
            p.cyan,
            event.name,
            p.reset,
            p.green,
            event.image,
            p.reset
        );
        if !event.exec_duration.is_empty() {
            out.push_str(&format!(
                " (after {}{}{})",
                p.white,
                human_duration(&event.exec_duration),
                p.reset
            ));
        }
        if !event.project.is_empty() && !event.service.is_empty() {
            out.push_str(&format!(
                " {}{}{}::{}{}{}",
                p.blue, event.project, p.reset, p.magenta, event.service, p.reset
            ));
        }
        if !event.exit_code.is_empty() {
            let color = if event.exit_code == "0" { p.green } else { p.red };
            out.push_str(&format!(" Exit code: {}{}{}", color, event.exit_code, p.reset));
            let details = exit_code_description(&event.exit_code);
            if !details.is_empty() {
                out.push_str(&format!(" \"{details}\""));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_event() -> Event {
        Event {
            name: "web-server".to_string(),
            image: "nginx:latest".to_string(),
            project: "myproject".to_string(),
            service: "webapp".to_string(),
            exit_code: "0".to_string(),
            exec_duration: "10".to_string(),
            ..Event::new("container", "start")
        }
    }

    #[test]
    fn exit_code_lookup_is_total_and_exact() {
        assert_eq!(exit_code_description("0"), "Success");
        assert_eq!(exit_code_description("1"), "Application error");
        assert_eq!(exit_code_description("137"), "Immediate termination SIGKILL");
        assert_eq!(exit_code_description("143"), "Graceful termination SIGTERM");
        assert_eq!(exit_code_description("999"), "");
        assert_eq!(exit_code_description(""), "");
    }

    #[test]
    fn action_names_are_humanized() {
        assert_eq!(action_name("die"), "stop");
        assert_eq!(action_name("health_status: healthy"), "healthy");
        assert_eq!(action_name("health_status: unhealthy"), "unhealthy");
        assert_eq!(action_name("start"), "start");
        assert_eq!(action_name("restart"), "restart");
    }

    #[test]
    fn durations_render_in_human_form() {
        assert_eq!(human_duration("10"), "10s");
        assert_eq!(human_duration("65"), "1m5s");
        assert_eq!(human_duration("3700"), "1h1m40s");
        assert_eq!(human_duration("0"), "0s");
        // Unparseable values keep the raw label with a seconds suffix.
        assert_eq!(human_duration("1.5"), "1.5s");
        assert_eq!(human_duration("soon"), "soons");
    }

    #[test]
    fn plain_renders_all_segments() {
        let renderer = Renderer::new();
        assert_eq!(
            renderer.render(&full_event(), RenderFormat::Plain),
            "container start web-server (nginx:latest) (after 10s) \
             myproject::webapp Exit code: 0 \"Success\""
        );
    }

    #[test]
    fn markdown_wraps_identifiers_and_bolds_the_action() {
        let renderer = Renderer::new();
        let mut event = full_event();
        event.action = "die".to_string();
        event.exit_code = "1".to_string();
        assert_eq!(
            renderer.render(&event, RenderFormat::Markdown),
            "container *stop* `web-server` (`nginx:latest`) (after 10s) \
             `myproject`::`webapp` Exit code: `1` \"_Application error_\""
        );
    }

    #[test]
    fn markdown_neutralizes_backticks_inside_identifiers() {
        let renderer = Renderer::new();
        let mut event = Event::new("container", "start");
        event.name = "odd`name".to_string();
        event.image = "img".to_string();
        let rendered = renderer.render(&event, RenderFormat::Markdown);
        assert!(rendered.contains("`odd'name`"), "got: {rendered}");
    }

    #[test]
    fn html_escapes_identifiers() {
        let renderer = Renderer::new();
        let mut event = full_event();
        event.name = "a<b>&\"c".to_string();
        event.exit_code = String::new();
        event.exec_duration = String::new();
        assert_eq!(
            renderer.render(&event, RenderFormat::Html),
            "container <b>start</b> <code>a&lt;b&gt;&amp;&quot;c</code> \
             (<code>nginx:latest</code>) <code>myproject</code>::<code>webapp</code>"
        );
    }

    #[test]
    fn html_renders_duration_and_exit_details() {
        let renderer = Renderer::new();
        let mut event = full_event();
        event.action = "die".to_string();
        event.exit_code = "137".to_string();
        event.project = String::new();
        assert_eq!(
            renderer.render(&event, RenderFormat::Html),
            "container <b>stop</b> <code>web-server</code> (<code>nginx:latest</code>) \
             (after <u>10s</u>) Exit code: <code>137</code> \
             \"<i>Immediate termination SIGKILL</i>\""
        );
    }

    #[test]
    fn ansi_colors_exit_code_by_success() {
        let renderer = Renderer::new();
        let p = AnsiPalette::default();

        let mut event = full_event();
        event.project = String::new();
        event.exec_duration = String::new();
        let ok = renderer.render(&event, RenderFormat::Ansi);
        assert!(ok.contains(&format!("Exit code: {}0{}", p.green, p.reset)), "got: {ok}");

        event.exit_code = "137".to_string();
        let failed = renderer.render(&event, RenderFormat::Ansi);
        assert!(
            failed.contains(&format!("Exit code: {}137{}", p.red, p.reset)),
            "got: {failed}"
        );
        assert!(failed.contains("\"Immediate termination SIGKILL\""));
    }

    #[test]
    fn ansi_decorates_each_field_with_its_color() {
        let renderer = Renderer::new();
        let p = AnsiPalette::default();
        let mut event = full_event();
        event.exit_code = String::new();
        assert_eq!(
            renderer.render(&event, RenderFormat::Ansi),
            format!(
                "container {y}start{r} {c}web-server{r} {g}(nginx:latest){r} \
                 (after {w}10s{r}) {b}myproject{r}::{m}webapp{r}",
                y = p.yellow,
                c = p.cyan,
                g = p.green,
                w = p.white,
                b = p.blue,
                m = p.magenta,
                r = p.reset
            )
        );
    }

    #[test]
    fn override_message_wins_in_every_format() {
        let renderer = Renderer::new();
        let mut event = full_event();
        event.message = Some("Docker daemon connection restored".to_string());

        for format in [RenderFormat::Plain, RenderFormat::Html, RenderFormat::Ansi] {
            assert_eq!(
                renderer.render(&event, format),
                "Docker daemon connection restored"
            );
        }
        // Markdown escapes reserved characters but nothing else.
        event.message = Some("alert_with*markup".to_string());
        assert_eq!(
            renderer.render(&event, RenderFormat::Markdown),
            "alert\\_with\\*markup"
        );
    }

    #[test]
    fn compose_segment_requires_both_project_and_service() {
        let renderer = Renderer::new();
        let mut event = full_event();
        event.service = String::new();
        let rendered = renderer.render(&event, RenderFormat::Plain);
        assert!(!rendered.contains("myproject"), "got: {rendered}");

        let mut event = full_event();
        event.project = String::new();
        let rendered = renderer.render(&event, RenderFormat::Plain);
        assert!(!rendered.contains("webapp"), "got: {rendered}");
    }

    #[test]
    fn missing_labels_render_no_segments() {
        let renderer = Renderer::new();
        let mut event = Event::new("container", "start");
        event.name = "db".to_string();
        event.image = "postgres:16".to_string();
        assert_eq!(
            renderer.render(&event, RenderFormat::Plain),
            "container start db (postgres:16)"
        );
    }

    #[test]
    fn unmapped_exit_code_has_no_description() {
        let renderer = Renderer::new();
        let mut event = Event::new("container", "die");
        event.name = "job".to_string();
        event.image = "batch:1".to_string();
        event.exit_code = "42".to_string();
        assert_eq!(
            renderer.render(&event, RenderFormat::Plain),
            "container stop job (batch:1) Exit code: 42"
        );
    }

    #[test]
    fn rendering_is_idempotent() {
        let renderer = Renderer::new();
        let event = full_event();
        for format in [
            RenderFormat::Plain,
            RenderFormat::Markdown,
            RenderFormat::Html,
            RenderFormat::Ansi,
        ] {
            assert_eq!(renderer.render(&event, format), renderer.render(&event, format));
        }
    }
}
