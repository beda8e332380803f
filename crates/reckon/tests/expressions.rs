//! End-to-end tests for single-expression evaluation through the engine

use reckon::prelude::*;
use rust_decimal::Decimal;

fn dec(s: &str) -> Value {
    Value::Decimal(s.parse::<Decimal>().unwrap())
}

fn eval(source: &str) -> EvalResult {
    Engine::default().evaluate(source, &EvaluationContext::new())
}

fn eval_ctx(source: &str, json: serde_json::Value) -> EvalResult {
    Engine::default().evaluate(source, &EvaluationContext::from_json(&json))
}

#[test]
fn test_decimal_exactness() {
    assert_eq!(eval("0.1 + 0.2").value, dec("0.3"));
    assert_eq!(eval("1000.10 - 1000.00").value, dec("0.10"));
    assert_eq!(eval("19.99 * 3").value, dec("59.97"));
}

#[test]
fn test_number_string_round_trip() {
    for expr in ["0.1 + 0.2", "19.99 * 3", "1 / 3", "0 - 12.005"] {
        let d = eval(expr).value;
        let round_tripped = Engine::default().evaluate(
            "NUMBER(STRING($d))",
            &{
                let mut ctx = EvaluationContext::new();
                ctx.set_variable("d", d.clone());
                ctx
            },
        );
        assert_eq!(round_tripped.value, d, "round trip failed for {}", expr);
    }
}

#[test]
fn test_result_envelope_success() {
    let result = eval("1 + 1");
    assert!(result.success);
    assert!(result.error.is_none());
    assert!(result.elapsed_ms >= 0.0);
}

#[test]
fn test_result_envelope_captures_errors() {
    let result = eval("1 / 0");
    assert!(!result.success);
    assert_eq!(result.value, Value::Null);
    assert_eq!(result.error, Some(EngineError::DivisionByZero));

    let result = eval("1 +");
    assert!(!result.success);
    assert!(matches!(
        result.error,
        Some(EngineError::UnexpectedToken { .. })
    ));
}

#[test]
fn test_accessed_variables_in_envelope() {
    let result = eval_ctx("$a + $b + @c", serde_json::json!({ "a": 1, "b": 2 }));
    // @c is missing, so this fails in strict mode, but all three accesses
    // are still recorded
    assert!(!result.success);
    assert_eq!(result.accessed_variables, vec!["a", "b", "@c"]);
}

#[test]
fn test_short_circuit_property() {
    let result = eval("false && $undef");
    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.value, Value::Bool(false));

    let result = eval("true || $undef");
    assert!(result.success);
    assert_eq!(result.value, Value::Bool(true));
}

#[test]
fn test_ternary_and_nested_access_scenario() {
    // S5: grade banding
    let result = eval_ctx(
        "$score >= 90 ? \"A\" : ($score >= 80 ? \"B\" : \"C\")",
        serde_json::json!({ "score": 85 }),
    );
    assert_eq!(result.value, Value::from("B"));

    // S5: nested member access
    let result = eval_ctx(
        "$customer.address.city",
        serde_json::json!({ "customer": { "address": { "city": "NY" } } }),
    );
    assert_eq!(result.value, Value::from("NY"));
}

#[test]
fn test_lookup_table_scenario() {
    // S3: matching and non-matching criteria
    let ctx = serde_json::json!({
        "table": [
            { "region": "US", "category": "food", "rate": 0.02 },
            { "region": "EU", "category": "food", "rate": 0.10 },
        ]
    });
    let result = eval_ctx(
        "LOOKUP($table, {region: \"EU\", category: \"food\"}, \"rate\")",
        ctx.clone(),
    );
    assert_eq!(result.value, dec("0.10"));

    let result = eval_ctx(
        "LOOKUP($table, {region: \"JP\", category: \"food\"}, \"rate\")",
        ctx,
    );
    assert_eq!(result.value, dec("0"));
}

#[test]
fn test_range_tiers_scenario() {
    // S4: tiered rates with an open-ended top tier
    let ctx = serde_json::json!({
        "tiers": [
            { "min": 0, "max": 1000, "rate": 0.10 },
            { "min": 1000, "max": 5000, "rate": 0.15 },
            { "min": 5000, "max": null, "rate": 0.20 },
        ]
    });
    let call = |v: &str| {
        eval_ctx(
            &format!("RANGE($tiers, {}, \"min\", \"max\", \"rate\")", v),
            ctx.clone(),
        )
    };
    assert_eq!(call("1000").value, dec("0.15"));
    assert_eq!(call("5000").value, dec("0.20"));
    assert_eq!(call("0 - 5").value, dec("0"));
}

#[test]
fn test_iterating_functions_end_to_end() {
    let ctx = serde_json::json!({
        "lines": [
            { "price": 9.99, "qty": 2 },
            { "price": 5.00, "qty": 1 },
        ]
    });
    let result = eval_ctx("SUM($lines, $it.price * $it.qty)", ctx.clone());
    assert_eq!(result.value, dec("24.98"));

    let result = eval_ctx("COUNT(FILTER($lines, $it.qty > 1))", ctx.clone());
    assert_eq!(result.value, dec("1"));

    let result = eval_ctx("SUM(MAP($lines, $it.price))", ctx);
    assert_eq!(result.value, dec("14.99"));
}

#[test]
fn test_strict_and_lenient_modes() {
    let result = eval("$missing");
    assert!(matches!(
        result.error,
        Some(EngineError::UndefinedVariable { .. })
    ));

    let mut config = EngineConfig::default();
    config.strict_mode = false;
    let mut engine = Engine::new(config).unwrap();
    let result = engine.evaluate("$missing", &EvaluationContext::new());
    assert!(result.success);
    assert_eq!(result.value, Value::Null);
    assert_eq!(result.accessed_variables, vec!["missing"]);
}

#[test]
fn test_security_limits_fire() {
    let mut config = EngineConfig::default();
    config.security.max_expression_length = 10;
    let mut engine = Engine::new(config).unwrap();
    let result = engine.evaluate("1 + 2 + 3 + 4 + 5", &EvaluationContext::new());
    assert!(matches!(
        result.error,
        Some(EngineError::MaxExpressionLength { .. })
    ));

    let mut config = EngineConfig::default();
    config.security.max_iterations = 3;
    let mut engine = Engine::new(config).unwrap();
    let ctx = EvaluationContext::from_json(&serde_json::json!({ "xs": [1, 2, 3, 4, 5] }));
    let result = engine.evaluate("MAP($xs, $it)", &ctx);
    assert_eq!(result.error, Some(EngineError::MaxIterations { limit: 3 }));

    let mut config = EngineConfig::default();
    config.security.max_recursion_depth = 8;
    let mut engine = Engine::new(config).unwrap();
    let source = "1 + ".repeat(20) + "1";
    let result = engine.evaluate(&source, &EvaluationContext::new());
    assert_eq!(result.error, Some(EngineError::MaxRecursion { limit: 8 }));
}

#[test]
fn test_float_literals_and_auto_conversion() {
    // explicit float literal passes through as a float
    let result = eval("TYPEOF(1.5f)");
    assert_eq!(result.value, Value::from("number"));
    // plain literals are decimal
    let result = eval("TYPEOF(1.5)");
    assert_eq!(result.value, Value::from("decimal"));
    // float variables upgrade to decimal on read
    let mut ctx = EvaluationContext::new();
    ctx.set_variable("f", Value::Float(2.5));
    let result = Engine::default().evaluate("TYPEOF($f)", &ctx);
    assert_eq!(result.value, Value::from("decimal"));
}

#[test]
fn test_division_scale_configuration() {
    let mut config = EngineConfig::default();
    config.decimal.division_scale = 4;
    config.decimal.rounding_mode = RoundingMode::Floor;
    let mut engine = Engine::new(config).unwrap();
    let result = engine.evaluate("2 / 3", &EvaluationContext::new());
    assert_eq!(result.value, dec("0.6666"));
}

#[test]
fn test_object_literal_iteration_order() {
    // declaration order is observable through serialization
    let result = eval("{zulu: 1, alpha: 2, mike: 3}");
    let json = result.value.to_json();
    let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["zulu", "alpha", "mike"]);
}

#[test]
fn test_error_envelope_serialization() {
    let result = eval("NO_SUCH(1)");
    let error = result.error.unwrap();
    let json = error.to_json();
    assert_eq!(json["code"], "UNDEFINED_FUNCTION");
    assert_eq!(json["category"], "validation");
    assert_eq!(json["name"], "NO_SUCH");
}

#[test]
fn test_decimal_serializes_as_text() {
    let result = eval("0.1 + 0.2");
    assert_eq!(result.value.to_json(), serde_json::json!("0.3"));
    let result = eval("[1.10, 2.20]");
    assert_eq!(result.value.to_json(), serde_json::json!(["1.1", "2.2"]));
}
