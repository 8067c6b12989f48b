//! CSV export of analysis outcomes

use crate::stack::ExpressionOutcome;

const HEADER: [&str; 13] = [
    "name",
    "expression",
    "method",
    "nominal",
    "center",
    "lower_tol",
    "upper_tol",
    "lower_bound",
    "upper_bound",
    "lower_limit",
    "upper_limit",
    "status",
    "note",
];

fn limit(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One record per expression; failed expressions carry their error as the note
pub fn render(outcomes: &[ExpressionOutcome]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER)?;

    for outcome in outcomes {
        match outcome {
            ExpressionOutcome::Evaluated(r) => writer.write_record([
                r.name.clone(),
                r.expression.clone(),
                r.method.code().to_string(),
                r.nominal.to_string(),
                r.center.to_string(),
                r.lower_tol.to_string(),
                r.upper_tol.to_string(),
                r.lower_bound.to_string(),
                r.upper_bound.to_string(),
                limit(r.lower_limit),
                limit(r.upper_limit),
                if r.passed { "pass" } else { "fail" }.to_string(),
                r.note.clone().unwrap_or_default(),
            ])?,
            ExpressionOutcome::Failed {
                name,
                expression,
                error,
                ..
            } => {
                let mut record = vec![name.clone(), expression.clone()];
                record.resize(HEADER.len() - 2, String::new());
                record.push("error".to_string());
                record.push(error.to_string());
                writer.write_record(&record)?;
            }
        }
    }

    let data = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sampler;
    use crate::stack::{analyze, AnalysisOptions, Row, Rows, Stack};

    #[test]
    fn test_csv_records() {
        let mut s = Sampler::seeded(2_000, 3);
        let rows = Rows {
            constants: vec![],
            dimensions: vec![
                Row::new(["A", "10", "0.1", "-0.1"]),
                Row::new(["Z", "0", "1", "-1"]),
            ],
            expressions: vec![
                Row::new(["GAP", "A - 4", "5.5", "6.5", "W", "gap, nominal"]),
                Row::new(["BAD", "A / Z"]),
            ],
        };
        let stack = Stack::parse(&rows, &mut s).unwrap();
        let outcomes = analyze(&stack, &AnalysisOptions::default(), &mut s);
        let text = render(&outcomes).unwrap();

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), HEADER.len());

        let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "GAP");
        assert_eq!(&records[0][2], "W");
        assert_eq!(&records[0][11], "pass");
        assert_eq!(&records[0][12], "gap, nominal");
        assert_eq!(&records[1][11], "error");
        assert!(records[1][12].contains("divisor 'Z'"));
        assert_eq!(&records[1][3], "");
    }
}
