use robocalib_core::Real;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JointDataError {
    #[error("joint data is empty")]
    Empty,
    #[error("line {line}: expected {expected} values, got {got}")]
    Width {
        line: usize,
        expected: usize,
        got: usize,
    },
    #[error("line {line}: '{value}' is not a number")]
    Parse { line: usize, value: String },
}

/// Parse joint recordings: a header row (`j1,j2,...,jN`) followed by one
/// comma-separated row of joint values per robot stop.
///
/// Blank lines are skipped. Every row must have as many values as the
/// header; line numbers in errors are 1-based.
pub fn parse_joint_csv(text: &str) -> Result<Vec<Vec<Real>>, JointDataError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty());
    let (_, header) = lines.next().ok_or(JointDataError::Empty)?;
    let width = header.split(',').count();

    lines
        .map(|(line, row)| {
            let values = row
                .split(',')
                .map(|v| {
                    let v = v.trim();
                    v.parse::<Real>().map_err(|_| JointDataError::Parse {
                        line,
                        value: v.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if values.len() != width {
                return Err(JointDataError::Width {
                    line,
                    expected: width,
                    got: values.len(),
                });
            }
            Ok(values)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_template_rows() {
        let csv = "j1,j2,j3,j4,j5,j6\n0.0,0.5,-1.2,0.0,1.57,0.0\n\n0.2,0.7,-1.0,0.1,1.47,0.1\n";
        let rows = parse_joint_csv(csv).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec![0.2, 0.7, -1.0, 0.1, 1.47, 0.1]);
    }

    #[test]
    fn reports_bad_rows_with_line_numbers() {
        assert_eq!(parse_joint_csv("  \n"), Err(JointDataError::Empty));
        assert_eq!(
            parse_joint_csv("j1,j2\n1.0\n"),
            Err(JointDataError::Width {
                line: 2,
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            parse_joint_csv("j1,j2\n1.0,abc\n"),
            Err(JointDataError::Parse {
                line: 2,
                value: "abc".into()
            })
        );
    }
}
