//! Step operations and the static pattern table that dispatches them.
//!
//! Each operation takes the scenario context explicitly. The cucumber
//! [`World`](crate::world::EcuWorld) and the table dispatcher below both call
//! the same functions. The table matches step lines the way cucumber matches
//! feature steps: by keyword, with `And`/`But` continuing the previous one,
//! and with placeholders accepting either quote style.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::client::RoscoClient;
use crate::context::ScenarioContext;
use crate::error::{StepError, StepResult};
use crate::value::display_value;

pub const CONNECTED_FIELD: &str = "Connected";
pub const INITIALISED_FIELD: &str = "Initialised";

// ---------- Operations ----------

/// `the serial port "{port}"`
pub fn set_port(ctx: &mut ScenarioContext, port: &str) {
    tracing::debug!(port, "set serial port");
    ctx.set_port(port);
}

/// `the ConnectAndInitialise Rest API is called`
pub fn invoke_connect(ctx: &mut ScenarioContext, client: &RoscoClient) -> StepResult {
    let port = ctx.port()?.to_string();
    let response = client.connect(&port)?;
    ctx.set_response(response.status, response.body);
    Ok(())
}

/// `the ECU connection is "{connected}"`
pub fn assert_connected(ctx: &ScenarioContext, connected: &str) -> StepResult {
    assert_field(ctx, CONNECTED_FIELD, connected)
}

/// `the ECU has been initialised "{initialised}"`
pub fn assert_initialised(ctx: &ScenarioContext, initialised: &str) -> StepResult {
    assert_field(ctx, INITIALISED_FIELD, initialised)
}

/// `disconnect the ECU`
pub fn disconnect(ctx: &ScenarioContext, client: &RoscoClient) -> StepResult {
    let port = ctx.port()?;
    client.disconnect(port)?;
    Ok(())
}

/// Compare the text form of `response[field]` with `expected`.
pub fn assert_field(ctx: &ScenarioContext, field: &str, expected: &str) -> StepResult {
    let actual = display_value(ctx.field(field)?);
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::Mismatch {
            field: field.to_string(),
            expected: expected.to_string(),
            actual,
        })
    }
}

// ---------- Static table ----------

/// Gherkin keyword a binding is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Given,
    When,
    Then,
}

type Handler = fn(&mut ScenarioContext, &RoscoClient, Option<&str>) -> StepResult;

/// One step pattern and its handler.
///
/// Patterns hold at most one `"{name}"` placeholder. Like a cucumber
/// `{string}` it matches text in double or single quotes, backslash escapes
/// included, and hands the text between the quotes to the handler as written.
pub struct StepBinding {
    pub keyword: Keyword,
    pub pattern: &'static str,
    handler: Handler,
}

impl std::fmt::Debug for StepBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepBinding")
            .field("keyword", &self.keyword)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

pub static STEP_BINDINGS: [StepBinding; 6] = [
    StepBinding {
        keyword: Keyword::Given,
        pattern: r#"the serial port "{port}""#,
        handler: set_port_handler,
    },
    StepBinding {
        keyword: Keyword::When,
        pattern: "the ConnectAndInitialise Rest API is called",
        handler: connect_handler,
    },
    StepBinding {
        keyword: Keyword::Then,
        pattern: r#"the ECU connection is "{connected}""#,
        handler: connected_handler,
    },
    StepBinding {
        keyword: Keyword::Then,
        pattern: r#"the ECU has been initialised "{initialised}""#,
        handler: initialised_handler,
    },
    StepBinding {
        keyword: Keyword::Then,
        pattern: "disconnect the ECU",
        handler: disconnect_handler,
    },
    StepBinding {
        keyword: Keyword::When,
        pattern: "disconnect the ECU",
        handler: disconnect_handler,
    },
];

fn set_port_handler(ctx: &mut ScenarioContext, _: &RoscoClient, arg: Option<&str>) -> StepResult {
    set_port(ctx, arg.unwrap_or_default());
    Ok(())
}

fn connect_handler(ctx: &mut ScenarioContext, client: &RoscoClient, _: Option<&str>) -> StepResult {
    invoke_connect(ctx, client)
}

fn connected_handler(ctx: &mut ScenarioContext, _: &RoscoClient, arg: Option<&str>) -> StepResult {
    assert_connected(ctx, arg.unwrap_or_default())
}

fn initialised_handler(
    ctx: &mut ScenarioContext,
    _: &RoscoClient,
    arg: Option<&str>,
) -> StepResult {
    assert_initialised(ctx, arg.unwrap_or_default())
}

fn disconnect_handler(ctx: &mut ScenarioContext, client: &RoscoClient, _: Option<&str>) -> StepResult {
    disconnect(ctx, client)
}

static KEYWORD_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(Given|When|Then|And|But)\s+(.*)$").expect("keyword regex")
});

static COMPILED: Lazy<Vec<(Regex, &'static StepBinding)>> = Lazy::new(|| {
    STEP_BINDINGS
        .iter()
        .map(|binding| (compile_pattern(binding.pattern), binding))
        .collect()
});

/// Same shape as the cucumber `{string}` parameter: group 1 holds double
/// quoted text, group 2 single quoted text.
const QUOTED: &str = r#"(?:"([^"\\]*(?:\\.[^"\\]*)*)"|'([^'\\]*(?:\\.[^'\\]*)*)')"#;

/// Turn a step pattern into an anchored regex with one capture per placeholder.
fn compile_pattern(pattern: &str) -> Regex {
    static PLACEHOLDER: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#""\\\{\w+\\\}""#).expect("placeholder regex"));

    let escaped = regex::escape(pattern);
    let source = PLACEHOLDER.replace_all(&escaped, regex::NoExpand(QUOTED));
    Regex::new(&format!("^{source}$")).expect("step patterns are valid")
}

/// Split the leading Gherkin keyword off `text`.
///
/// `And` and `But` take the keyword of the step before them and are invalid
/// as the first step. Text without a keyword yields `None`.
fn split_keyword<'t>(text: &'t str, previous: Option<Keyword>) -> Option<(Keyword, &'t str)> {
    let caps = KEYWORD_PREFIX.captures(text.trim())?;
    let keyword = match caps.get(1)?.as_str() {
        "Given" => Keyword::Given,
        "When" => Keyword::When,
        "Then" => Keyword::Then,
        _ => previous?,
    };
    Some((keyword, caps.get(2)?.as_str().trim_end()))
}

/// A step line matched against the table.
#[derive(Debug)]
pub struct Resolved {
    pub binding: &'static StepBinding,
    /// Keyword the step ran under, after `And`/`But` resolution
    pub keyword: Keyword,
    /// Quoted placeholder text, if the pattern has one
    pub arg: Option<String>,
}

/// Find the binding for the step line `text`.
///
/// `previous` is the keyword of the step before it in the same scenario.
/// A binding only matches under the keyword it is registered with.
pub fn resolve(text: &str, previous: Option<Keyword>) -> Option<Resolved> {
    let (keyword, body) = split_keyword(text, previous)?;
    COMPILED
        .iter()
        .filter(|(_, binding)| binding.keyword == keyword)
        .find_map(|(regex, binding)| {
            regex.captures(body).map(|caps| Resolved {
                binding: *binding,
                keyword,
                arg: caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| m.as_str().to_string()),
            })
        })
}

/// Run the single step line `text` and return the keyword it ran under.
pub fn dispatch(
    ctx: &mut ScenarioContext,
    client: &RoscoClient,
    text: &str,
    previous: Option<Keyword>,
) -> StepResult<Keyword> {
    let resolved =
        resolve(text, previous).ok_or_else(|| StepError::UnknownStep(text.trim().to_string()))?;
    tracing::debug!(
        pattern = resolved.binding.pattern,
        keyword = ?resolved.keyword,
        arg = ?resolved.arg,
        "dispatching step"
    );
    (resolved.binding.handler)(ctx, client, resolved.arg.as_deref())?;
    Ok(resolved.keyword)
}

/// A step of a script that failed.
#[derive(Debug, Error)]
#[error("step {line} ({text}) failed: {source}")]
pub struct ScriptError {
    /// 1-based position in the script.
    pub line: usize,
    pub text: String,
    #[source]
    pub source: StepError,
}

/// Run step lines in order against one context, stopping at the first failure.
///
/// Every step line starts with `Given`, `When`, `Then`, `And` or `But`, as in
/// a feature file. Blank lines and `#` comments are skipped.
pub fn run_script<'a, I>(
    ctx: &mut ScenarioContext,
    client: &RoscoClient,
    lines: I,
) -> Result<usize, ScriptError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut executed = 0;
    let mut previous = None;
    for (idx, line) in lines.into_iter().enumerate() {
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            continue;
        }
        let keyword = dispatch(ctx, client, text, previous).map_err(|source| ScriptError {
            line: idx + 1,
            text: text.to_string(),
            source,
        })?;
        previous = Some(keyword);
        executed += 1;
    }
    Ok(executed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with(body: serde_json::Value) -> ScenarioContext {
        let mut ctx = ScenarioContext::new();
        ctx.set_response(200, body.as_object().cloned().unwrap());
        ctx
    }

    #[test]
    fn resolves_every_pattern() {
        let cases = [
            (r#"Given the serial port "COM3""#, None, "the serial port", Some("COM3")),
            ("When the ConnectAndInitialise Rest API is called", None, "the ConnectAndInitialise", None),
            (r#"Then the ECU connection is "True""#, None, "the ECU connection", Some("True")),
            (r#"And the ECU has been initialised "False""#, Some(Keyword::Then), "the ECU has been", Some("False")),
            ("But disconnect the ECU", Some(Keyword::Then), "disconnect", None),
            ("When disconnect the ECU", None, "disconnect", None),
        ];
        for (text, previous, prefix, arg) in cases {
            let resolved = resolve(text, previous).unwrap_or_else(|| panic!("no match: {text}"));
            assert!(resolved.binding.pattern.starts_with(prefix), "{text}");
            assert_eq!(resolved.arg.as_deref(), arg, "{text}");
        }
    }

    #[test]
    fn placeholder_keeps_spaces_and_slashes() {
        let resolved = resolve(r#"Given the serial port "/dev/tty.usbserial 1""#, None).unwrap();
        assert_eq!(resolved.arg.as_deref(), Some("/dev/tty.usbserial 1"));
    }

    #[test]
    fn placeholder_accepts_single_quotes_and_escapes() {
        let resolved = resolve("Then the ECU connection is 'True'", None).unwrap();
        assert_eq!(resolved.arg.as_deref(), Some("True"));

        let resolved = resolve(r#"Given the serial port "COM"3""#, None).unwrap();
        assert_eq!(resolved.arg.as_deref(), Some(r#"COM\"3"#));

        assert!(resolve(r#"Then the ECU connection is "True'"#, None).is_none());
    }

    #[test]
    fn binding_only_matches_its_keyword() {
        assert!(resolve(r#"Then the serial port "COM3""#, None).is_none());
        assert!(resolve("Given the ConnectAndInitialise Rest API is called", None).is_none());
        assert!(resolve(r#"And the serial port "COM3""#, Some(Keyword::When)).is_none());

        let resolved = resolve(r#"And the serial port "COM3""#, Some(Keyword::Given)).unwrap();
        assert_eq!(resolved.keyword, Keyword::Given);
    }

    #[test]
    fn step_needs_a_leading_keyword() {
        assert!(resolve(r#"the serial port "COM3""#, None).is_none());
        assert!(resolve("And disconnect the ECU", None).is_none());
    }

    #[test]
    fn partial_text_does_not_match() {
        assert!(resolve("When the ConnectAndInitialise Rest API is called twice", None).is_none());
        assert!(resolve("Then disconnect", None).is_none());
    }

    #[test]
    fn unknown_step_is_reported() {
        let client = RoscoClient::new(crate::client::DEFAULT_BASE_URL).unwrap();
        let mut ctx = ScenarioContext::new();
        let err = dispatch(&mut ctx, &client, "Given a flux capacitor", None).unwrap_err();
        assert!(matches!(err, StepError::UnknownStep(text) if text == "Given a flux capacitor"));
    }

    #[test]
    fn assertions_compare_text_forms() {
        let ctx = ctx_with(json!({"Connected": true, "Initialised": false}));
        assert!(assert_connected(&ctx, "True").is_ok());
        assert!(assert_initialised(&ctx, "False").is_ok());

        let err = assert_connected(&ctx, "False").unwrap_err();
        assert!(matches!(
            err,
            StepError::Mismatch { ref field, ref actual, .. } if field == "Connected" && actual == "True"
        ));
    }

    #[test]
    fn lowercase_literal_does_not_match_boolean() {
        let ctx = ctx_with(json!({"Connected": true}));
        assert!(assert_connected(&ctx, "true").is_err());
    }

    #[test]
    fn missing_field_is_not_defaulted() {
        let ctx = ctx_with(json!({"Connected": "True"}));
        assert!(matches!(
            assert_initialised(&ctx, "False"),
            Err(StepError::MissingField { field }) if field == "Initialised"
        ));
    }

    #[test]
    fn steps_needing_a_port_fail_without_one() {
        let client = RoscoClient::new(crate::client::DEFAULT_BASE_URL).unwrap();
        let mut ctx = ScenarioContext::new();
        assert!(matches!(
            invoke_connect(&mut ctx, &client),
            Err(StepError::PortNotSet)
        ));
        assert!(matches!(disconnect(&ctx, &client), Err(StepError::PortNotSet)));
    }

    #[test]
    fn script_stops_at_first_failure() {
        let client = RoscoClient::new(crate::client::DEFAULT_BASE_URL).unwrap();
        let mut ctx = ScenarioContext::new();
        let script = [
            "# setup",
            r#"Given the serial port "COM7""#,
            "",
            r#"Then the ECU connection is "True""#,
            r#"Given the serial port "COM8""#,
        ];
        let err = run_script(&mut ctx, &client, script).unwrap_err();
        assert_eq!(err.line, 4);
        assert!(matches!(err.source, StepError::NoResponse));
        assert_eq!(ctx.port().unwrap(), "COM7");
    }

    #[test]
    fn script_carries_keyword_into_and() {
        let client = RoscoClient::new(crate::client::DEFAULT_BASE_URL).unwrap();
        let mut ctx = ScenarioContext::new();
        let script = [r#"Given the serial port "COM7""#, r#"And the serial port "COM8""#];
        assert_eq!(run_script(&mut ctx, &client, script).unwrap(), 2);
        assert_eq!(ctx.port().unwrap(), "COM8");

        let mut ctx = ScenarioContext::new();
        let script = [r#"Then the serial port "COM7""#];
        let err = run_script(&mut ctx, &client, script).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(err.source, StepError::UnknownStep(_)));
        assert!(ctx.port().is_err());
    }
}
