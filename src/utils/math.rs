//! 数值抽取与表达式比较
//!
//! 只做数值层面的比较，不做符号代数化简

use regex::Regex;
use std::sync::OnceLock;

/// 两个表达式的等价程度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Equivalence {
    /// 规范化后完全一致
    Exact,
    /// 数值在容差内
    Numerical,
    /// 数值在 2.5 倍容差内
    Partial,
    Different,
}

impl Equivalence {
    pub fn is_equivalent(self) -> bool {
        !matches!(self, Equivalence::Different)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Equivalence::Exact => "exact",
            Equivalence::Numerical => "numerical",
            Equivalence::Partial => "partial",
            Equivalence::Different => "different",
        }
    }
}

struct Patterns {
    trailing_unit: Regex,
    fraction: Regex,
    scientific: Regex,
    number: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        trailing_unit: Regex::new(r"[a-z]+$").expect("valid regex"),
        fraction: Regex::new(r"(-?\d+\.?\d*)\s*/\s*(-?\d+\.?\d*)").expect("valid regex"),
        scientific: Regex::new(r"-?\d+\.?\d*[eE]-?\d+").expect("valid regex"),
        number: Regex::new(r"-?\d+\.?\d*").expect("valid regex"),
    })
}

/// 从文本中抽取数值
///
/// 支持整数、小数、分数 `1/2`、科学计数法 `1.5e-3`，以及带单位的写法 `42 volts`
pub fn extract_numerical_value(text: &str) -> Option<f64> {
    let p = patterns();
    let lowered = text.trim().to_lowercase();
    let text = p.trailing_unit.replace(&lowered, "");
    let text = text.trim();

    if let Ok(value) = text.parse::<f64>() {
        if value.is_finite() {
            return Some(value);
        }
    }

    if let Some(caps) = p.fraction.captures(text) {
        let numerator: Option<f64> = caps[1].parse().ok();
        let denominator: Option<f64> = caps[2].parse().ok();
        if let (Some(n), Some(d)) = (numerator, denominator) {
            if d != 0.0 {
                return Some(n / d);
            }
        }
    }

    if let Some(m) = p.scientific.find(text) {
        if let Ok(value) = m.as_str().parse::<f64>() {
            return Some(value);
        }
    }

    p.number
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// 比较两个表达式是否等价
///
/// `tolerance` 为相对容差（0.02 即 2%）
pub fn compare_expressions(expected: &str, actual: &str, tolerance: f64) -> Equivalence {
    let (a, b) = (normalize(expected), normalize(actual));
    if !a.is_empty() && a == b {
        return Equivalence::Exact;
    }

    let (Some(x), Some(y)) = (extract_numerical_value(expected), extract_numerical_value(actual))
    else {
        return Equivalence::Different;
    };

    let diff = (x - y).abs();
    let scale = x.abs().max(y.abs());
    if diff <= scale * tolerance {
        Equivalence::Numerical
    } else if diff <= scale * tolerance * 2.5 {
        Equivalence::Partial
    } else {
        Equivalence::Different
    }
}

/// 相对误差百分比；期望值为 0 时按绝对值计
pub fn error_percent(expected: f64, actual: f64) -> f64 {
    if expected != 0.0 {
        (actual - expected).abs() / expected.abs() * 100.0
    } else {
        actual.abs() * 100.0
    }
}

fn normalize(expr: &str) -> String {
    expr.chars()
        .filter(|c| !c.is_whitespace() && *c != '$')
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .replace("**", "^")
        .replace("\\cdot", "*")
        .replace("\\times", "*")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_numbers() {
        assert_eq!(extract_numerical_value("42"), Some(42.0));
        assert_eq!(extract_numerical_value(" 3.14 "), Some(3.14));
        assert_eq!(extract_numerical_value("-7"), Some(-7.0));
    }

    #[test]
    fn test_extract_with_units_and_fractions() {
        assert_eq!(extract_numerical_value("42 volts"), Some(42.0));
        assert_eq!(extract_numerical_value("3/4"), Some(0.75));
        assert_eq!(extract_numerical_value("1.5e-3"), Some(0.0015));
        assert_eq!(extract_numerical_value("V = 12.5 V"), Some(12.5));
    }

    #[test]
    fn test_extract_none_for_text() {
        assert_eq!(extract_numerical_value("no idea"), None);
        assert_eq!(extract_numerical_value(""), None);
    }

    #[test]
    fn test_fraction_with_zero_denominator_falls_through() {
        assert_eq!(extract_numerical_value("5/0"), Some(5.0));
    }

    #[test]
    fn test_compare_expressions() {
        assert_eq!(compare_expressions("x^2 + 1", "x ^ 2+1", 0.02), Equivalence::Exact);
        assert_eq!(compare_expressions("100", "101", 0.02), Equivalence::Numerical);
        assert_eq!(compare_expressions("100", "104", 0.02), Equivalence::Partial);
        assert_eq!(compare_expressions("100", "120", 0.02), Equivalence::Different);
        assert_eq!(compare_expressions("x+y", "y-x", 0.02), Equivalence::Different);
    }

    #[test]
    fn test_error_percent() {
        assert!((error_percent(50.0, 51.0) - 2.0).abs() < 1e-9);
        assert!((error_percent(0.0, 0.01) - 1.0).abs() < 1e-9);
    }
}
