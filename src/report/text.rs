//! Plain-text stack report

use tabled::{builder::Builder, settings::Style};

use crate::stack::{AnalysisInfo, ExpressionOutcome, ExpressionResult, Stack};

/// Width of sensitivity and contribution bars, excluding brackets
pub const BAR_WIDTH: usize = 19;

const INDENT: &str = "       ";

/// Report header and section switches
#[derive(Debug, Clone, Default)]
pub struct ReportHeader {
    pub info: AnalysisInfo,
    pub units: String,
    pub where_used: bool,
}

/// Format to `sig_figs` significant figures in decimal or scientific
/// notation, whichever is shorter. The sign is always shown.
pub fn format_shortest(num: f64, sig_figs: usize) -> String {
    let sig_figs = sig_figs.max(1);
    let scientific = format_scientific(num, sig_figs - 1);
    let decimal = format_significant(num, sig_figs);
    if scientific.len() < decimal.len() {
        scientific
    } else {
        decimal
    }
}

/// Scientific notation with a signed, unpadded exponent (`+1.23e-4`)
fn format_scientific(num: f64, precision: usize) -> String {
    let formatted = format!("{:+.*e}", precision, num);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => match exp.parse::<i32>() {
            Ok(e) => format!("{}e{}{}", mantissa, if e < 0 { '-' } else { '+' }, e.abs()),
            Err(_) => formatted,
        },
        None => formatted,
    }
}

/// Decimal notation rounded to `sig_figs` significant figures
fn format_significant(num: f64, sig_figs: usize) -> String {
    if !num.is_finite() {
        return format!("{:+}", num);
    }
    if num == 0.0 {
        return format!("{:+.*}", sig_figs - 1, num);
    }

    let decimals = |value: f64| sig_figs as i32 - 1 - value.abs().log10().floor() as i32;

    // rounding may carry into the next decade (9.996 -> 10.0)
    let rounded = round_to(num, decimals(num));
    let places = decimals(rounded);
    if places > 0 {
        format!("{:+.*}", places as usize, rounded)
    } else {
        format!("{:+.0}", round_to(rounded, places))
    }
}

/// Round to `places` decimal places; negative places round to tens, hundreds, ...
fn round_to(num: f64, places: i32) -> f64 {
    if places >= 0 {
        let scale = 10f64.powi(places);
        (num * scale).round() / scale
    } else {
        let scale = 10f64.powi(-places);
        (num / scale).round() * scale
    }
}

/// Left-aligned bar filled in proportion to `fraction` in `[0, 1]`
pub fn format_bar(fraction: f64, width: usize) -> String {
    let filled = fraction.clamp(0.0, 1.0) * width as f64;
    let bar: String = (0..width)
        .map(|i| if (i as f64) + 0.5 < filled { '=' } else { ' ' })
        .collect();
    format!("[{}]", bar)
}

/// Bar growing left or right of a center mark for `fraction` in `[-1, 1]`
pub fn format_center_bar(fraction: f64, width: usize) -> String {
    let width = if width % 2 == 0 { width + 1 } else { width };
    let center = width / 2;
    let fraction = fraction.clamp(-1.0, 1.0);

    let mut bar = vec![' '; width];
    let reach = (fraction.abs() * center as f64) as usize;
    for k in 1..=reach.min(center) {
        let i = if fraction > 0.0 { center + k } else { center - k };
        bar[i] = '=';
    }
    bar[center] = '|';

    format!("[{}]", bar.into_iter().collect::<String>())
}

/// Largest absolute value, or 1 when everything is near zero
fn bar_scale<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    let scale = values.fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale <= 1e-9 {
        1.0
    } else {
        scale
    }
}

fn used_in(stack: &Stack, name: &str) -> String {
    stack.used_in(name).join(", ")
}

/// Render the full report for a stack and its analysis outcomes
pub fn render(stack: &Stack, header: &ReportHeader, outcomes: &[ExpressionOutcome]) -> String {
    let mut output = String::new();
    let info = &header.info;

    if !info.title.is_empty() {
        output.push_str(&format!("{}\n", info.title.to_uppercase()));
    }
    if !info.doc_number.is_empty() || !info.revision.is_empty() {
        let sep = if info.doc_number.is_empty() { "Rev. " } else { "-" };
        output.push_str(&format!("{}{}{}\n", info.doc_number, sep, info.revision));
    }
    if !info.description.is_empty() {
        output.push_str(&format!("\n{}\n", info.description));
    }
    output.push_str(&format!(
        "\nTHIS DOCUMENT IN {}.\n\n",
        header.units.to_uppercase()
    ));

    if stack.constants().next().is_some() {
        output.push_str("CONSTANTS:\n");
        let mut builder = Builder::default();
        let mut columns = vec!["ID", "VALUE", "NOTE"];
        if header.where_used {
            columns.push("USED IN");
        }
        builder.push_record(columns);

        for c in stack.constants() {
            let mut record = vec![
                c.key().to_string(),
                format_shortest(c.nom(), 4),
                c.note().unwrap_or("").to_string(),
            ];
            if header.where_used {
                record.push(used_in(stack, c.key()));
            }
            builder.push_record(record);
        }
        output.push_str(&builder.build().with(Style::markdown()).to_string());
        output.push_str("\n\n");
    }

    if stack.dimensions().next().is_some() {
        output.push_str("DIMENSIONS:\n");
        let mut builder = Builder::default();
        let mut columns = vec!["ID", "NOMINAL", "PLUS", "MINUS", "D", "PN", "NOTE"];
        if header.where_used {
            columns.push("USED IN");
        }
        builder.push_record(columns);

        for d in stack.dimensions() {
            let mut record = vec![
                d.key().to_string(),
                format_shortest(d.nom(), 3),
                format_shortest(d.plus(), 3),
                format_shortest(d.minus(), 3),
                d.dist_type().code().to_string(),
                d.part_number().unwrap_or("").to_string(),
                d.note().unwrap_or("").to_string(),
            ];
            if header.where_used {
                record.push(used_in(stack, d.key()));
            }
            builder.push_record(record);
        }
        output.push_str(&builder.build().with(Style::markdown()).to_string());
        output.push_str("\n\n");
    }

    if outcomes.is_empty() {
        return output;
    }

    output.push_str("EXPRESSION SUMMARY:\n");
    output.push_str(&render_summary(outcomes));
    output.push_str("\n\nEXPRESSIONS:\n");
    for outcome in outcomes {
        output.push_str(&render_outcome(outcome));
        output.push('\n');
    }

    output
}

/// One row per expression with its bounds and status
pub fn render_summary(outcomes: &[ExpressionOutcome]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "METHOD", "NOMINAL", "LOWER", "UPPER", "STATUS", "NOTE"]);

    for outcome in outcomes {
        match outcome {
            ExpressionOutcome::Evaluated(r) => builder.push_record([
                r.name.clone(),
                r.method.code().to_string(),
                format_shortest(r.nominal, 3),
                format_shortest(r.lower_bound, 3),
                format_shortest(r.upper_bound, 3),
                if r.passed { "PASS" } else { "FAIL" }.to_string(),
                r.note.clone().unwrap_or_default(),
            ]),
            ExpressionOutcome::Failed { name, note, .. } => builder.push_record([
                name.clone(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
                "ERROR".to_string(),
                note.clone().unwrap_or_default(),
            ]),
        }
    }

    builder.build().with(Style::markdown()).to_string()
}

/// Detail block for one expression
pub fn render_outcome(outcome: &ExpressionOutcome) -> String {
    match outcome {
        ExpressionOutcome::Evaluated(result) => render_result(result),
        ExpressionOutcome::Failed {
            name,
            note,
            expression,
            error,
        } => {
            let mut lines = vec![format!("{:>5}: {}", name, note.as_deref().unwrap_or(""))];
            lines.push(format!("{}Expression: {}", INDENT, expression));
            lines.push(format!("{}ERROR: {}", INDENT, error));
            lines.join("\n") + "\n"
        }
    }
}

fn render_result(r: &ExpressionResult) -> String {
    let mut lines = vec![format!("{:>5}: {}", r.name, r.note.as_deref().unwrap_or(""))];
    lines.push(format!("{}Expression: {}", INDENT, r.expression));
    lines.push(format!("{}Expansion:  {}", INDENT, r.expansion));
    lines.push(format!("{}Evaluation: {}", INDENT, r.method));
    lines.push(format!("{}Nominal: {:>15}", INDENT, format_shortest(r.nominal, 3)));
    lines.push(format!(
        "{}Value:   {:>15} {} {}",
        INDENT,
        format_shortest(r.center, 3),
        format_shortest(r.upper_tol, 2),
        format_shortest(r.lower_tol, 2)
    ));

    lines.push(bound_line("Lower", r.lower_limit, r.check.lower, r.lower_bound));
    lines.push(bound_line("Upper", r.upper_limit, r.check.upper, r.upper_bound));

    if let Some(sensitivities) = &r.sensitivities {
        lines.push(format!("{}Sensitivities:", INDENT));
        let scale = bar_scale(sensitivities.values());
        for (var, partial) in sensitivities {
            lines.push(format!(
                "{:>16}: {:>10} {}",
                format!("∂/∂{}", var),
                format_shortest(*partial, 2),
                format_center_bar(partial / scale, BAR_WIDTH)
            ));
        }
    }

    if let Some(contributions) = &r.contributions {
        lines.push(format!("{}Contributions:", INDENT));
        let scale = bar_scale(contributions.values());
        for (var, tol) in contributions {
            let magnitude = format_shortest(*tol, 2);
            lines.push(format!(
                "{:>16}: {:>10} {}",
                var,
                format!("±{}", magnitude.trim_start_matches(['+', '-'])),
                format_bar(tol / scale, BAR_WIDTH)
            ));
        }
    }

    lines.join("\n") + "\n"
}

fn bound_line(label: &str, limit: Option<f64>, pass: bool, value: f64) -> String {
    match limit {
        None => format!("{:9}{} Bound:{:>10}  PASS", "", label, "NONE"),
        Some(limit) => {
            let marker = if pass { "" } else { "***" };
            let verdict = if pass {
                "PASS".to_string()
            } else {
                format!("FAIL: {}", format_shortest(value, 3))
            };
            format!(
                "{:<9}{} Bound:{:>10}  {}",
                marker,
                label,
                format_shortest(limit, 4),
                verdict
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sampler;
    use crate::stack::{analyze, AnalysisOptions, Row, Rows};

    #[test]
    fn test_format_shortest_decimal() {
        assert_eq!(format_shortest(6.0, 3), "+6.00");
        assert_eq!(format_shortest(-0.25, 2), "-0.25");
        assert_eq!(format_shortest(123456.0, 3), "+123000");
        assert_eq!(format_shortest(0.0, 3), "+0.00");
    }

    #[test]
    fn test_format_shortest_rounding_carry() {
        assert_eq!(format_shortest(9.996, 3), "+10.0");
        assert_eq!(format_shortest(99.96, 3), "+100");
        assert_eq!(format_shortest(0.09996, 3), "+0.100");
        assert_eq!(format_shortest(-9.999, 2), "-10");
    }

    #[test]
    fn test_format_shortest_scientific() {
        assert_eq!(format_shortest(0.000123, 3), "+1.23e-4");
        assert_eq!(format_shortest(1.5e12, 2), "+1.5e+12");
    }

    #[test]
    fn test_format_bar() {
        assert_eq!(format_bar(1.0, 4), "[====]");
        assert_eq!(format_bar(0.5, 4), "[==  ]");
        assert_eq!(format_bar(0.0, 4), "[    ]");
        assert_eq!(format_bar(7.0, 2), "[==]");
    }

    #[test]
    fn test_format_center_bar() {
        assert_eq!(format_center_bar(1.0, 5), "[  |==]");
        assert_eq!(format_center_bar(-1.0, 5), "[==|  ]");
        assert_eq!(format_center_bar(0.0, 5), "[  |  ]");
        assert_eq!(format_center_bar(0.5, 4), "[  |= ]");
        assert_eq!(format_center_bar(f64::NAN, 3), "[ | ]");
    }

    #[test]
    fn test_bar_scale() {
        assert_eq!(bar_scale([0.0, 1e-12].iter()), 1.0);
        assert_eq!(bar_scale([-4.0, 2.0].iter()), 4.0);
    }

    #[test]
    fn test_render_report() {
        let mut s = Sampler::seeded(2_000, 1);
        let rows = Rows {
            constants: vec![Row::new(["K", "2", "scale"])],
            dimensions: vec![
                Row::new(["A", "10", "0.1", "-0.1", "U", "PN-1"]),
                Row::new(["B", "4", "0.2", "-0.2"]),
                Row::new(["Z", "0", "0.5", "-0.5"]),
            ],
            expressions: vec![
                Row::new(["GAP", "A - B * K", "1.5", "1.6", "W", "gap"]),
                Row::new(["BAD", "A / Z"]),
            ],
        };
        let stack = Stack::parse(&rows, &mut s).unwrap();
        let options = AnalysisOptions {
            sensitivity: true,
            contributions: true,
        };
        let outcomes = analyze(&stack, &options, &mut s);
        let header = ReportHeader {
            info: AnalysisInfo {
                title: "Bracket".into(),
                doc_number: "D-1".into(),
                revision: "A".into(),
                description: String::new(),
            },
            units: "mm".into(),
            where_used: true,
        };

        let text = render(&stack, &header, &outcomes);
        assert!(text.starts_with("BRACKET\nD-1-A\n"));
        assert!(text.contains("THIS DOCUMENT IN MM."));
        assert!(text.contains("CONSTANTS:"));
        assert!(text.contains("USED IN"));
        assert!(text.contains("PN-1"));
        assert!(text.contains("EXPRESSION SUMMARY:"));
        assert!(text.contains("Expansion:  A - B * K"));
        assert!(text.contains("***      Upper Bound:"));
        assert!(text.contains("FAIL: +2.50"));
        assert!(text.contains("∂/∂B"));
        assert!(text.contains("Contributions:"));
        assert!(text.contains("ERROR: divisor 'Z'"));
    }

    #[test]
    fn test_unlimited_bounds_pass() {
        assert_eq!(bound_line("Lower", None, true, 0.0), "         Lower Bound:      NONE  PASS");
    }
}
