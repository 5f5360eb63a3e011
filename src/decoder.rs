//! Prometheus text exposition format decoder
//!
//! Parses a scrape body into metric families and pulls out the two
//! checkpoint gauges. The parser is strict: anything that is not valid
//! text format (version 0.0.4) is rejected with a [`ParseError`] naming the
//! offending line, so a misconfigured endpoint (an HTML error page, a JSON
//! API) shows up as a poll failure instead of silently reading as zero.

use crate::error::ParseError;
use crate::sample::{Gauge, Sample};
use std::collections::HashMap;
use std::fmt;

/// Metric type declared by a `# TYPE` line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricType {
    /// Type keywords are matched without regard to case
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "counter" => Some(MetricType::Counter),
            "gauge" => Some(MetricType::Gauge),
            "histogram" => Some(MetricType::Histogram),
            "summary" => Some(MetricType::Summary),
            "untyped" => Some(MetricType::Untyped),
            _ => None,
        }
    }

    /// Whether a family of this type reports a plain point-in-time value
    fn is_gauge_like(&self) -> bool {
        matches!(self, MetricType::Gauge | MetricType::Untyped)
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
            MetricType::Untyped => "untyped",
        };
        f.write_str(name)
    }
}

/// A single sample line
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub value: f64,
    pub timestamp_ms: Option<i64>,
}

/// All samples, help text and type reported under one family name
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFamily {
    name: String,
    help: Option<String>,
    declared_type: Option<MetricType>,
    samples: Vec<MetricSample>,
}

impl MetricFamily {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            help: None,
            declared_type: None,
            samples: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// Declared type, `Untyped` when the family had no `# TYPE` line
    pub fn metric_type(&self) -> MetricType {
        self.declared_type.unwrap_or(MetricType::Untyped)
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Value of the first sample, if this family reports plain values
    pub fn first_gauge_value(&self) -> Option<f64> {
        if !self.metric_type().is_gauge_like() {
            return None;
        }
        self.samples.first().map(|s| s.value)
    }
}

/// Parse a text format payload into metric families keyed by name
///
/// Families that only appear in `# HELP`/`# TYPE` lines without any sample
/// are dropped from the result.
pub fn parse_text(input: &str) -> Result<HashMap<String, MetricFamily>, ParseError> {
    let mut families: HashMap<String, MetricFamily> = HashMap::new();

    for (idx, raw) in input.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_start_matches([' ', '\t']);
        if line.is_empty() {
            continue;
        }

        if let Some(comment) = line.strip_prefix('#') {
            parse_comment(comment, line_no, &mut families)?;
        } else {
            let sample = parse_sample(line, line_no)?;
            let family_name = family_name_for(&families, &sample.name);
            families
                .entry(family_name.clone())
                .or_insert_with(|| MetricFamily::new(&family_name))
                .samples
                .push(sample);
        }
    }

    families.retain(|_, family| !family.samples.is_empty());
    Ok(families)
}

/// Decode the checkpoint gauges from a text format payload
///
/// Returns at most one Sample per gauge, known before synced. A gauge whose
/// family is missing from the payload is left out rather than reported as
/// an error.
pub fn decode_samples(input: &str) -> Result<Vec<Sample>, ParseError> {
    let families = parse_text(input)?;

    let mut samples = Vec::with_capacity(Gauge::ALL.len());
    for gauge in Gauge::ALL {
        let Some(family) = families.get(gauge.metric_name()) else {
            tracing::debug!(metric = %gauge, "Metric family absent from payload");
            continue;
        };

        match family.first_gauge_value() {
            Some(value) => samples.push(Sample::new(gauge, value)),
            None => tracing::debug!(
                metric = %gauge,
                metric_type = %family.metric_type(),
                "Metric family is not a gauge, ignoring"
            ),
        }
    }

    Ok(samples)
}

fn parse_comment(
    comment: &str,
    line_no: usize,
    families: &mut HashMap<String, MetricFamily>,
) -> Result<(), ParseError> {
    let comment = comment.trim_start_matches([' ', '\t']);
    let (keyword, rest) = split_token(comment);

    match keyword {
        "HELP" | "TYPE" => {}
        // Any other comment is free text
        _ => return Ok(()),
    }

    let (name, rest) = split_token(rest);
    if !is_valid_metric_name(name) {
        return Err(ParseError::new(
            line_no,
            format!("invalid metric name in comment: {:?}", name),
        ));
    }

    let family = families
        .entry(name.to_string())
        .or_insert_with(|| MetricFamily::new(name));

    if keyword == "HELP" {
        if family.help.is_some() {
            return Err(ParseError::new(
                line_no,
                format!("second HELP line for metric name {:?}", name),
            ));
        }
        family.help = Some(unescape_help(rest.trim_start_matches([' ', '\t']), line_no)?);
        return Ok(());
    }

    let type_token = rest.trim_matches([' ', '\t']);
    let Some(metric_type) = MetricType::parse(type_token) else {
        return Err(ParseError::new(
            line_no,
            format!("unknown metric type {:?}", type_token),
        ));
    };
    if family.declared_type.is_some() {
        return Err(ParseError::new(
            line_no,
            format!("second TYPE line for metric name {:?}", name),
        ));
    }
    if !family.samples.is_empty() {
        return Err(ParseError::new(
            line_no,
            format!("TYPE line for metric name {:?} reported after samples", name),
        ));
    }
    family.declared_type = Some(metric_type);
    Ok(())
}

fn parse_sample(line: &str, line_no: usize) -> Result<MetricSample, ParseError> {
    let name_len = line
        .char_indices()
        .find(|&(i, c)| !is_metric_name_char(c, i == 0))
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    if name_len == 0 {
        return Err(ParseError::new(
            line_no,
            format!("invalid metric name in line {:?}", line),
        ));
    }
    let name = &line[..name_len];
    let mut rest = &line[name_len..];

    let mut labels = Vec::new();
    if let Some(after_brace) = rest.strip_prefix('{') {
        rest = parse_labels(after_brace, line_no, &mut labels)?;
    }

    if !rest.starts_with([' ', '\t']) {
        return Err(ParseError::new(
            line_no,
            format!("expected whitespace before value for metric {:?}", name),
        ));
    }

    let (value_token, rest) = split_token(rest.trim_start_matches([' ', '\t']));
    if value_token.is_empty() {
        return Err(ParseError::new(
            line_no,
            format!("expected value for metric {:?}", name),
        ));
    }
    let value = parse_value(value_token).ok_or_else(|| {
        ParseError::new(
            line_no,
            format!("expected float as value, got {:?}", value_token),
        )
    })?;

    let (timestamp_token, rest) = split_token(rest);
    let timestamp_ms = if timestamp_token.is_empty() {
        None
    } else {
        Some(timestamp_token.parse::<i64>().map_err(|_| {
            ParseError::new(
                line_no,
                format!("expected integer as timestamp, got {:?}", timestamp_token),
            )
        })?)
    };

    if !rest.trim_matches([' ', '\t']).is_empty() {
        return Err(ParseError::new(
            line_no,
            format!("unexpected trailing content {:?}", rest.trim()),
        ));
    }

    Ok(MetricSample {
        name: name.to_string(),
        labels,
        value,
        timestamp_ms,
    })
}

/// Parse `name="value",...}` and return what follows the closing brace
fn parse_labels<'a>(
    mut input: &'a str,
    line_no: usize,
    labels: &mut Vec<(String, String)>,
) -> Result<&'a str, ParseError> {
    loop {
        input = input.trim_start_matches([' ', '\t']);
        if let Some(after) = input.strip_prefix('}') {
            return Ok(after);
        }
        if input.is_empty() {
            return Err(ParseError::new(line_no, "unterminated label set"));
        }

        let name_len = input
            .char_indices()
            .find(|&(i, c)| !is_label_name_char(c, i == 0))
            .map(|(i, _)| i)
            .unwrap_or(input.len());
        if name_len == 0 {
            return Err(ParseError::new(
                line_no,
                format!("invalid label name in {:?}", input),
            ));
        }
        let label_name = &input[..name_len];
        if labels.iter().any(|(existing, _)| existing == label_name) {
            return Err(ParseError::new(
                line_no,
                format!("duplicate label name {:?}", label_name),
            ));
        }

        input = input[name_len..].trim_start_matches([' ', '\t']);
        input = input.strip_prefix('=').ok_or_else(|| {
            ParseError::new(
                line_no,
                format!("expected '=' after label name {:?}", label_name),
            )
        })?;
        input = input.trim_start_matches([' ', '\t']);
        input = input.strip_prefix('"').ok_or_else(|| {
            ParseError::new(
                line_no,
                format!("expected '\"' to open value of label {:?}", label_name),
            )
        })?;

        let (label_value, after_value) = read_label_value(input, line_no)?;
        labels.push((label_name.to_string(), label_value));

        input = after_value.trim_start_matches([' ', '\t']);
        if let Some(after_comma) = input.strip_prefix(',') {
            input = after_comma;
        } else if !input.starts_with('}') {
            return Err(ParseError::new(
                line_no,
                format!("expected ',' or '}}' after value of label {:?}", label_name),
            ));
        }
    }
}

/// Read a quoted label value up to its closing quote, resolving escapes
fn read_label_value(input: &str, line_no: usize) -> Result<(String, &str), ParseError> {
    let mut value = String::new();
    let mut chars = input.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((value, &input[i + 1..])),
            '\\' => match chars.next() {
                Some((_, '\\')) => value.push('\\'),
                Some((_, '"')) => value.push('"'),
                Some((_, 'n')) => value.push('\n'),
                Some((_, other)) => {
                    return Err(ParseError::new(
                        line_no,
                        format!("invalid escape sequence '\\{}' in label value", other),
                    ));
                }
                None => break,
            },
            other => value.push(other),
        }
    }

    Err(ParseError::new(line_no, "unterminated label value"))
}

fn unescape_help(text: &str, line_no: usize) -> Result<String, ParseError> {
    let mut help = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            help.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => help.push('\\'),
            Some('n') => help.push('\n'),
            Some(other) => {
                return Err(ParseError::new(
                    line_no,
                    format!("invalid escape sequence '\\{}' in help text", other),
                ));
            }
            None => {
                return Err(ParseError::new(line_no, "dangling escape in help text"));
            }
        }
    }

    Ok(help)
}

/// Histogram and summary series carry suffixed names; fold them into the
/// family declared under the base name.
fn family_name_for(families: &HashMap<String, MetricFamily>, sample_name: &str) -> String {
    const SUFFIXES: [(&str, &[MetricType]); 3] = [
        ("_bucket", &[MetricType::Histogram]),
        ("_sum", &[MetricType::Histogram, MetricType::Summary]),
        ("_count", &[MetricType::Histogram, MetricType::Summary]),
    ];

    for (suffix, types) in SUFFIXES {
        if let Some(base) = sample_name.strip_suffix(suffix)
            && families
                .get(base)
                .is_some_and(|f| types.contains(&f.metric_type()))
        {
            return base.to_string();
        }
    }

    sample_name.to_string()
}

fn parse_value(token: &str) -> Option<f64> {
    match token {
        "NaN" => Some(f64::NAN),
        "+Inf" | "Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        _ => token.parse::<f64>().ok(),
    }
}

/// Split off the next whitespace-delimited token
fn split_token(input: &str) -> (&str, &str) {
    let input = input.trim_start_matches([' ', '\t']);
    match input.find([' ', '\t']) {
        Some(end) => (&input[..end], &input[end..]),
        None => (input, ""),
    }
}

fn is_metric_name_char(c: char, first: bool) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || (!first && c.is_ascii_digit())
}

fn is_label_name_char(c: char, first: bool) -> bool {
    c.is_ascii_alphabetic() || c == '_' || (!first && c.is_ascii_digit())
}

fn is_valid_metric_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .char_indices()
            .all(|(i, c)| is_metric_name_char(c, i == 0))
}
