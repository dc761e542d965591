//! Line-oriented netlist reader and emitter.
//!
//! Grammar, one element per line:
//!
//! ```text
//! <kind><id> <wire1> <wire2> [...] <value1> [<value2> ...]   # comment
//! ```
//!
//! Lines starting with `#` or `.` are ignored (`.` is reserved for directive
//! extensions), as are blank lines. Value fields are handed to the element
//! kind's positional schema; independent sources additionally accept
//! `SIN(...)`, `PULSE(...)` and `PWL(...)` waveforms, and current-controlled
//! sources name their controlling element in the first value field.

use crate::circuit::Circuit;
use crate::error::{Error, Result};
use crate::graph::Element;
use crate::kind::{ElementKind, KindRegistry};
use crate::values::ValueMap;
use crate::waveform::Waveform;

/// Parse netlist text into a circuit.
pub(crate) fn parse(registry: KindRegistry, text: &str) -> Result<Circuit> {
    let mut circuit = Circuit::with_registry(registry);
    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('.') {
            log::debug!("line {line_no}: directive ignored: {line}");
            continue;
        }
        let element = parse_element(circuit.registry(), line_no, line)?;
        circuit.add_element(element).map_err(|err| match err {
            Error::DuplicateElement { element } => Error::ParseError {
                line: line_no,
                reason: format!("duplicate element id {element}"),
            },
            other => other,
        })?;
    }
    Ok(circuit)
}

fn parse_element(registry: &KindRegistry, line_no: usize, line: &str) -> Result<Element> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let head = tokens[0];

    let mut chars = head.chars();
    let prefix = chars.next().unwrap_or('?');
    if !prefix.is_ascii_alphabetic() {
        return Err(Error::ParseError {
            line: line_no,
            reason: format!("expected element name, got '{head}'"),
        });
    }
    let kind = registry.lookup(prefix);
    if kind == ElementKind::Unknown {
        return Err(Error::UnknownElementKind {
            token: head.to_string(),
        });
    }
    let id: u32 = chars.as_str().parse().map_err(|_| Error::ParseError {
        line: line_no,
        reason: format!("bad element id in '{head}'"),
    })?;

    let expected = kind.post_count();
    let pin_tokens = &tokens[1..];
    if pin_tokens.len() < expected {
        return Err(Error::PinCountMismatch {
            kind: kind.name(),
            expected,
            got: pin_tokens.len(),
        });
    }
    let mut pins = Vec::with_capacity(expected);
    for token in &pin_tokens[..expected] {
        let wire: u32 = token.parse().map_err(|_| Error::ParseError {
            line: line_no,
            reason: format!("bad wire id '{token}'"),
        })?;
        pins.push(wire);
    }

    let mut element = Element::new(id, kind, &pins);
    load_values(line_no, &mut element, &pin_tokens[expected..])?;
    Ok(element)
}

/// Map the free-form value fields onto the kind's schema.
fn load_values(line_no: usize, element: &mut Element, tokens: &[&str]) -> Result<()> {
    let kind = element.kind;
    let mut tokens = tokens;

    // Source waveforms consume the whole tail.
    if matches!(
        kind,
        ElementKind::VoltageSource | ElementKind::CurrentSource
    ) && tokens
        .first()
        .is_some_and(|t| is_waveform_start(t))
    {
        let text = tokens.join(" ");
        element.source = Some(parse_waveform(line_no, &text)?);
        element.values.set("dc", 0.0);
        return Ok(());
    }

    // Current-controlled sources name their controlling element first.
    if matches!(kind, ElementKind::Cccs | ElementKind::Ccvs) {
        let token = tokens.first().ok_or_else(|| Error::ParseError {
            line: line_no,
            reason: format!("{} requires a control element reference", kind.name()),
        })?;
        let ctrl = parse_element_ref(token).ok_or_else(|| Error::ParseError {
            line: line_no,
            reason: format!("bad control element reference '{token}'"),
        })?;
        element.values.set("ctrl", ctrl as f64);
        tokens = &tokens[1..];
        return load_schema(line_no, element, &kind.value_keys()[1..], tokens);
    }

    load_schema(line_no, element, kind.value_keys(), tokens)
}

fn load_schema(
    line_no: usize,
    element: &mut Element,
    keys: &[(&'static str, Option<f64>)],
    tokens: &[&str],
) -> Result<()> {
    for (i, &(key, default)) in keys.iter().enumerate() {
        match tokens.get(i) {
            Some(token) => {
                let value = parse_value(token).ok_or_else(|| Error::ParseError {
                    line: line_no,
                    reason: format!("bad value '{token}' for {key}"),
                })?;
                element.values.set(key, value);
            }
            None => match default {
                Some(value) => element.values.set(key, value),
                None => {
                    return Err(Error::ParseError {
                        line: line_no,
                        reason: format!("{} requires a value for {key}", element.kind.name()),
                    });
                }
            },
        }
    }
    Ok(())
}

/// Parse a number with an optional engineering suffix
/// (`f p n u m k meg g t`, case-insensitive).
pub fn parse_value(token: &str) -> Option<f64> {
    let lower = token.trim().to_ascii_lowercase();
    let (num, multiplier) = if let Some(stripped) = lower.strip_suffix("meg") {
        (stripped, 1e6)
    } else {
        let (head, suffix) = lower.split_at(lower.len().saturating_sub(1));
        match suffix {
            "f" => (head, 1e-15),
            "p" => (head, 1e-12),
            "n" => (head, 1e-9),
            "u" => (head, 1e-6),
            "m" => (head, 1e-3),
            "k" => (head, 1e3),
            "g" => (head, 1e9),
            "t" => (head, 1e12),
            _ => (lower.as_str(), 1.0),
        }
    };
    num.parse::<f64>().ok().map(|v| v * multiplier)
}

/// Parse a control reference: a bare id or a prefixed name like `V0`.
fn parse_element_ref(token: &str) -> Option<u32> {
    let digits = token.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    digits.parse().ok()
}

fn is_waveform_start(token: &str) -> bool {
    let upper = token.to_ascii_uppercase();
    upper.starts_with("SIN(") || upper.starts_with("PULSE(") || upper.starts_with("PWL(")
}

/// Parse `NAME(arg arg ...)` waveform syntax.
fn parse_waveform(line_no: usize, text: &str) -> Result<Waveform> {
    let open = text.find('(').ok_or_else(|| Error::ParseError {
        line: line_no,
        reason: "expected '(' in waveform".to_string(),
    })?;
    let close = text.rfind(')').ok_or_else(|| Error::ParseError {
        line: line_no,
        reason: "expected ')' in waveform".to_string(),
    })?;
    let name = text[..open].trim().to_ascii_uppercase();
    let args: Vec<f64> = text[open + 1..close]
        .split_whitespace()
        .map(|t| {
            parse_value(t).ok_or_else(|| Error::ParseError {
                line: line_no,
                reason: format!("bad waveform argument '{t}'"),
            })
        })
        .collect::<Result<_>>()?;

    let arg = |i: usize| args.get(i).copied().unwrap_or(0.0);
    match name.as_str() {
        "SIN" => {
            if args.len() < 3 {
                return Err(Error::ParseError {
                    line: line_no,
                    reason: "SIN takes at least offset, amplitude, freq".to_string(),
                });
            }
            Ok(Waveform::sin_full(arg(0), arg(1), arg(2), arg(3), arg(4)))
        }
        "PULSE" => {
            if args.len() < 2 {
                return Err(Error::ParseError {
                    line: line_no,
                    reason: "PULSE takes at least v1, v2".to_string(),
                });
            }
            Ok(Waveform::pulse(
                arg(0),
                arg(1),
                arg(2),
                arg(3),
                arg(4),
                arg(5),
                arg(6),
            ))
        }
        "PWL" => {
            if args.is_empty() || args.len() % 2 != 0 {
                return Err(Error::ParseError {
                    line: line_no,
                    reason: "PWL takes time/value pairs".to_string(),
                });
            }
            let points = args.chunks(2).map(|c| (c[0], c[1])).collect();
            Ok(Waveform::pwl(points))
        }
        other => Err(Error::ParseError {
            line: line_no,
            reason: format!("unknown waveform '{other}'"),
        }),
    }
}

/// Render a circuit back to netlist text.
pub(crate) fn emit(circuit: &Circuit) -> String {
    let mut out = String::new();
    for element in circuit.link().elements() {
        out.push_str(&format!("{}{}", element.kind.prefix(), element.id));
        for pin in &element.pins {
            out.push_str(&format!(" {pin}"));
        }
        if let Some(waveform) = &element.source {
            out.push(' ');
            out.push_str(&emit_waveform(waveform));
        } else {
            emit_values(&mut out, element.kind, &element.values);
        }
        out.push('\n');
    }
    out
}

fn emit_values(out: &mut String, kind: ElementKind, values: &ValueMap) {
    for &(key, default) in kind.value_keys() {
        let value = values
            .get(key)
            .or(default)
            .unwrap_or(0.0);
        out.push_str(&format!(" {value}"));
    }
}

fn emit_waveform(waveform: &Waveform) -> String {
    match waveform {
        Waveform::Dc(v) => format!("{v}"),
        Waveform::Sin {
            offset,
            amplitude,
            freq,
            delay,
            theta,
        } => format!("SIN({offset} {amplitude} {freq} {delay} {theta})"),
        Waveform::Pulse {
            v1,
            v2,
            delay,
            rise,
            fall,
            width,
            period,
        } => format!("PULSE({v1} {v2} {delay} {rise} {fall} {width} {period})"),
        Waveform::Pwl(points) => {
            let body: Vec<String> = points.iter().map(|(t, v)| format!("{t} {v}")).collect();
            format!("PWL({})", body.join(" "))
        }
    }
}
