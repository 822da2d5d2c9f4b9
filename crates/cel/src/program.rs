//! Compiled programs and the activation they evaluate against.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::CelError;
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::parser::parse_expr;
use crate::value::Value;

/// The named values an expression can reference.
///
/// Routing exposes `alert_*` fields plus optional `customer_*`/`site_*`
/// enrichment; the activation itself is a plain name→value map.
#[derive(Debug, Clone, Default)]
pub struct Activation {
    vars: HashMap<String, Value>,
}

impl Activation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    /// Bind a string-valued map variable (labels, annotations).
    #[must_use]
    pub fn with_string_map(
        mut self,
        name: impl Into<String>,
        map: &HashMap<String, String>,
    ) -> Self {
        let value = Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        );
        self.vars.insert(name.into(), value);
        self
    }

    fn resolve(&self, name: &str) -> Result<Value, CelError> {
        self.vars
            .get(name)
            .cloned()
            .ok_or_else(|| CelError::UndefinedVariable(name.to_owned()))
    }
}

/// A parsed expression ready for repeated evaluation.
#[derive(Debug, Clone)]
pub struct Program {
    source: String,
    expr: Expr,
}

impl Program {
    /// Compile an expression string.
    pub fn compile(source: &str) -> Result<Self, CelError> {
        let expr = parse_expr(source)?;
        Ok(Self {
            source: source.to_owned(),
            expr,
        })
    }

    /// The original expression text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against an activation.
    pub fn eval(&self, activation: &Activation) -> Result<Value, CelError> {
        eval(&self.expr, activation)
    }

    /// Evaluate and reduce to truthiness.
    pub fn eval_bool(&self, activation: &Activation) -> Result<bool, CelError> {
        Ok(self.eval(activation)?.is_truthy())
    }
}

/// Recursively evaluate an expression.
fn eval(expr: &Expr, activation: &Activation) -> Result<Value, CelError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Float(f) => Ok(Value::Float(*f)),
        Expr::String(s) => Ok(Value::String(s.clone())),

        Expr::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval(item, activation)?);
            }
            Ok(Value::List(out))
        }

        Expr::Map(entries) => {
            let mut out = HashMap::with_capacity(entries.len());
            for (key, value) in entries {
                out.insert(key.clone(), eval(value, activation)?);
            }
            Ok(Value::Map(out))
        }

        Expr::Ident(name) => activation.resolve(name),
        Expr::Field(base, field) => eval(base, activation)?.field(field),
        Expr::Index(base, index) => {
            let base = eval(base, activation)?;
            let index = eval(index, activation)?;
            base.index(&index)
        }

        Expr::Unary(op, inner) => {
            let value = eval(inner, activation)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                UnaryOp::Neg => match value {
                    Value::Int(n) => Ok(Value::Int(-n)),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(CelError::Type(format!(
                        "cannot negate {}",
                        other.type_name()
                    ))),
                },
            }
        }

        Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, activation),

        Expr::Ternary(cond, then_branch, else_branch) => {
            if eval(cond, activation)?.is_truthy() {
                eval(then_branch, activation)
            } else {
                eval(else_branch, activation)
            }
        }

        Expr::Call(name, args) => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval(arg, activation)?);
            }
            call_builtin(name, &values)
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    activation: &Activation,
) -> Result<Value, CelError> {
    // Logical operators short-circuit.
    match op {
        BinaryOp::And => {
            if !eval(lhs, activation)?.is_truthy() {
                return Ok(Value::Bool(false));
            }
            return Ok(Value::Bool(eval(rhs, activation)?.is_truthy()));
        }
        BinaryOp::Or => {
            if eval(lhs, activation)?.is_truthy() {
                return Ok(Value::Bool(true));
            }
            return Ok(Value::Bool(eval(rhs, activation)?.is_truthy()));
        }
        _ => {}
    }

    let left = eval(lhs, activation)?;
    let right = eval(rhs, activation)?;

    match op {
        BinaryOp::Add => match (&left, &right) {
            (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{a}{b}"))),
            _ => numeric(&left, &right, op),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            numeric(&left, &right, op)
        }

        BinaryOp::Eq => Ok(Value::Bool(values_equal(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&left, &right))),
        BinaryOp::Lt => compare(&left, &right, Ordering::is_lt),
        BinaryOp::Le => compare(&left, &right, Ordering::is_le),
        BinaryOp::Gt => compare(&left, &right, Ordering::is_gt),
        BinaryOp::Ge => compare(&left, &right, Ordering::is_ge),

        BinaryOp::Contains => match (&left, &right) {
            (Value::String(haystack), Value::String(needle)) => {
                Ok(Value::Bool(haystack.contains(needle)))
            }
            (Value::List(items), needle) => Ok(Value::Bool(items.contains(needle))),
            (Value::Map(m), Value::String(key)) => Ok(Value::Bool(m.contains_key(key))),
            _ => Err(type_error("contains", &left, &right)),
        },
        BinaryOp::StartsWith => match (&left, &right) {
            (Value::String(s), Value::String(prefix)) => Ok(Value::Bool(s.starts_with(prefix))),
            _ => Err(type_error("startsWith", &left, &right)),
        },
        BinaryOp::EndsWith => match (&left, &right) {
            (Value::String(s), Value::String(suffix)) => Ok(Value::Bool(s.ends_with(suffix))),
            _ => Err(type_error("endsWith", &left, &right)),
        },
        BinaryOp::Matches => match (&left, &right) {
            (Value::String(s), Value::String(pattern)) => {
                let re = regex::Regex::new(pattern)
                    .map_err(|e| CelError::Evaluation(format!("invalid regex: {e}")))?;
                Ok(Value::Bool(re.is_match(s)))
            }
            _ => Err(type_error("matches", &left, &right)),
        },
        BinaryOp::In => match &right {
            Value::List(items) => Ok(Value::Bool(items.contains(&left))),
            Value::Map(m) => match &left {
                Value::String(key) => Ok(Value::Bool(m.contains_key(key))),
                _ => Err(type_error("in", &left, &right)),
            },
            Value::String(haystack) => match &left {
                Value::String(needle) => Ok(Value::Bool(haystack.contains(needle))),
                _ => Err(type_error("in", &left, &right)),
            },
            _ => Err(type_error("in", &left, &right)),
        },

        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

#[allow(clippy::cast_precision_loss)]
fn numeric(left: &Value, right: &Value, op: BinaryOp) -> Result<Value, CelError> {
    let (a, b) = match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            return int_numeric(*a, *b, op);
        }
        (Value::Float(a), Value::Float(b)) => (*a, *b),
        (Value::Int(a), Value::Float(b)) => (*a as f64, *b),
        (Value::Float(a), Value::Int(b)) => (*a, *b as f64),
        _ => return Err(type_error("arithmetic", left, right)),
    };
    if b == 0.0 && matches!(op, BinaryOp::Div | BinaryOp::Mod) {
        return Err(CelError::Evaluation("division by zero".into()));
    }
    let out = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => unreachable!("numeric op"),
    };
    Ok(Value::Float(out))
}

fn int_numeric(a: i64, b: i64, op: BinaryOp) -> Result<Value, CelError> {
    if b == 0 && matches!(op, BinaryOp::Div | BinaryOp::Mod) {
        return Err(CelError::Evaluation("division by zero".into()));
    }
    let out = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => unreachable!("numeric op"),
    };
    Ok(Value::Int(out))
}

/// Equality with int/float coercion; other cross-type comparisons are
/// simply unequal.
#[allow(clippy::cast_precision_loss, clippy::float_cmp)]
fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => left == right,
    }
}

#[allow(clippy::cast_precision_loss)]
fn compare(
    left: &Value,
    right: &Value,
    pred: fn(Ordering) -> bool,
) -> Result<Value, CelError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64)
            .partial_cmp(b)
            .ok_or_else(|| CelError::Evaluation("incomparable floats".into()))?,
        (Value::Float(a), Value::Int(b)) => a
            .partial_cmp(&(*b as f64))
            .ok_or_else(|| CelError::Evaluation("incomparable floats".into()))?,
        (Value::Float(a), Value::Float(b)) => a
            .partial_cmp(b)
            .ok_or_else(|| CelError::Evaluation("incomparable floats".into()))?,
        _ => return Err(type_error("compare", left, right)),
    };
    Ok(Value::Bool(pred(ordering)))
}

#[allow(clippy::cast_possible_wrap)]
fn call_builtin(name: &str, args: &[Value]) -> Result<Value, CelError> {
    match (name, args) {
        ("len", [Value::String(s)]) => Ok(Value::Int(s.chars().count() as i64)),
        ("len", [Value::List(v)]) => Ok(Value::Int(v.len() as i64)),
        ("len", [Value::Map(m)]) => Ok(Value::Int(m.len() as i64)),
        ("to_int", [Value::Int(n)]) => Ok(Value::Int(*n)),
        #[allow(clippy::cast_possible_truncation)]
        ("to_int", [Value::Float(f)]) => Ok(Value::Int(*f as i64)),
        ("to_int", [Value::String(s)]) => s
            .trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| CelError::Evaluation(format!("cannot parse {s:?} as int"))),
        ("to_string", [v]) => Ok(Value::String(match v {
            Value::String(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_owned(),
            other => format!("{other:?}"),
        })),
        ("lower", [Value::String(s)]) => Ok(Value::String(s.to_lowercase())),
        ("upper", [Value::String(s)]) => Ok(Value::String(s.to_uppercase())),
        ("has", [v]) => Ok(Value::Bool(!matches!(v, Value::Null))),
        _ => Err(CelError::Evaluation(format!(
            "unknown function {name}/{}",
            args.len()
        ))),
    }
}

fn type_error(op: &str, left: &Value, right: &Value) -> CelError {
    CelError::Type(format!(
        "cannot {op} {} and {}",
        left.type_name(),
        right.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert_activation() -> Activation {
        let labels = HashMap::from([
            ("severity".to_owned(), "critical".to_owned()),
            ("site".to_owned(), "us-east-1".to_owned()),
        ]);
        Activation::new()
            .with_string_map("alert_labels", &labels)
            .with("alert_severity", Value::String("critical".into()))
            .with("alert_source", Value::String("prometheus".into()))
            .with("alert_id", Value::String("a-1".into()))
            .with("alert_summary", Value::String("disk full on db-1".into()))
    }

    #[test]
    fn label_index_equality() {
        let program = Program::compile(r#"alert_labels["severity"] == "critical""#).unwrap();
        assert!(program.eval_bool(&alert_activation()).unwrap());
    }

    #[test]
    fn missing_label_is_null_and_falsy() {
        let program = Program::compile(r#"alert_labels["missing"]"#).unwrap();
        assert_eq!(program.eval(&alert_activation()).unwrap(), Value::Null);
        assert!(!program.eval_bool(&alert_activation()).unwrap());
    }

    #[test]
    fn field_access_on_map() {
        let program = Program::compile(r#"alert_labels.site == "us-east-1""#).unwrap();
        assert!(program.eval_bool(&alert_activation()).unwrap());
    }

    #[test]
    fn in_membership() {
        let program =
            Program::compile(r#"alert_severity in ["high", "critical"]"#).unwrap();
        assert!(program.eval_bool(&alert_activation()).unwrap());

        let program = Program::compile(r#""staging" in alert_labels"#).unwrap();
        assert!(!program.eval_bool(&alert_activation()).unwrap());
    }

    #[test]
    fn string_predicates() {
        let activation = alert_activation();
        assert!(Program::compile(r#"alert_summary.contains("disk")"#)
            .unwrap()
            .eval_bool(&activation)
            .unwrap());
        assert!(Program::compile(r#"alert_summary.matches("disk|cpu")"#)
            .unwrap()
            .eval_bool(&activation)
            .unwrap());
        assert!(Program::compile(r#"alert_source.startsWith("prom")"#)
            .unwrap()
            .eval_bool(&activation)
            .unwrap());
    }

    #[test]
    fn invalid_regex_is_eval_error() {
        let program = Program::compile(r#"alert_summary.matches("([")"#).unwrap();
        assert!(matches!(
            program.eval(&alert_activation()).unwrap_err(),
            CelError::Evaluation(_)
        ));
    }

    #[test]
    fn undefined_variable() {
        let program = Program::compile("customer_tier == 1").unwrap();
        assert!(matches!(
            program.eval(&alert_activation()).unwrap_err(),
            CelError::UndefinedVariable(_)
        ));
    }

    #[test]
    fn arithmetic_and_comparison() {
        let activation = Activation::new().with("criticality", Value::Int(4));
        assert!(Program::compile("criticality * 2 >= 8")
            .unwrap()
            .eval_bool(&activation)
            .unwrap());
        assert!(matches!(
            Program::compile("criticality / 0")
                .unwrap()
                .eval(&activation)
                .unwrap_err(),
            CelError::Evaluation(_)
        ));
    }

    #[test]
    fn int_float_coercion() {
        let activation = Activation::new().with("x", Value::Int(2));
        assert!(Program::compile("x == 2.0")
            .unwrap()
            .eval_bool(&activation)
            .unwrap());
        assert!(Program::compile("x < 2.5")
            .unwrap()
            .eval_bool(&activation)
            .unwrap());
    }

    #[test]
    fn ternary_and_builtins() {
        let activation = alert_activation();
        let program =
            Program::compile(r#"size(alert_labels) > 0 ? "routed" : "dropped""#).unwrap();
        assert_eq!(
            program.eval(&activation).unwrap(),
            Value::String("routed".into())
        );
        assert!(Program::compile(r#"lower("CRIT") == "crit""#)
            .unwrap()
            .eval_bool(&activation)
            .unwrap());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let activation = alert_activation();
        let program = Program::compile(
            r#"alert_labels["severity"] == "critical" && alert_source != "manual""#,
        )
        .unwrap();
        let first = program.eval_bool(&activation).unwrap();
        let second = program.eval_bool(&activation).unwrap();
        assert_eq!(first, second);
        assert!(first);
    }
}
