use indexmap::IndexMap;
use serde_json::json;
use targex::{Error, EvalError, Transforms, Value, compile, evaluate, matches};

async fn eval(source: &str, context: Value) -> Result<Value, Error> {
    evaluate(source, &context, &Transforms::standard()).await
}

async fn eval_ok(source: &str, context: Value) -> Value {
    eval(source, context).await.unwrap()
}

fn json_object(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = IndexMap::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v);
    }
    Value::Object(map)
}

fn empty() -> Value {
    json_object(vec![])
}

fn normandy() -> Value {
    Value::from(json!({
        "normandy": {
            "channel": "beta",
            "version": "120.0.1",
            "versionMajor": 120,
            "locale": "en-US",
            "userId": "user-1",
            "isFirstRun": false,
            "locales": ["en-US", "de", "fr"],
            "addons": [
                {"id": "a@mozilla.org", "active": true, "version": "1.0"},
                {"id": "b@mozilla.org", "active": false, "version": "2.0"},
                {"id": "c@mozilla.org", "active": true, "version": "3.0"}
            ],
            "prefs": {"browser.startup.page": 3, "1": "one"},
            "recipe": {"id": 42, "arguments": {"slug": "test-study"}}
        }
    }))
}

// ============================================================================
// Arithmetic and precedence
// ============================================================================

#[tokio::test]
async fn test_precedence() {
    assert_eq!(eval_ok("2+3*4", empty()).await, Value::Integer(14));
    assert_eq!(eval_ok("(2+3)*4", empty()).await, Value::Integer(20));
    assert_eq!(eval_ok("2 * 3 ^ 2", empty()).await, Value::Integer(18));
    assert_eq!(eval_ok("10 - 4 - 3", empty()).await, Value::Integer(3));
    assert_eq!(eval_ok("-2 * 3", empty()).await, Value::Integer(-6));
}

#[tokio::test]
async fn test_arithmetic() {
    assert_eq!(eval_ok("7 / 2", empty()).await, Value::Float(3.5));
    assert_eq!(eval_ok("7 // 2", empty()).await, Value::Integer(3));
    assert_eq!(eval_ok("7 % 3", empty()).await, Value::Integer(1));
    assert_eq!(eval_ok("0.1 + 0.2 > 0.3", empty()).await, Value::Boolean(true));
    assert_eq!(eval_ok("100 * 1.1", empty()).await, Value::Integer(110));
}

#[tokio::test]
async fn test_division_by_zero() {
    assert_eq!(
        eval("1 / 0", empty()).await,
        Err(Error::Eval(EvalError::DivisionByZero))
    );
    assert_eq!(
        eval("1 % 0", empty()).await,
        Err(Error::Eval(EvalError::DivisionByZero))
    );
}

#[tokio::test]
async fn test_string_concatenation() {
    assert_eq!(
        eval_ok("normandy.channel + '-' + normandy.versionMajor", normandy()).await,
        Value::from("beta-120")
    );
    assert!(matches!(
        eval("'a' + normandy.locales", normandy()).await,
        Err(Error::Eval(EvalError::TypeError(_)))
    ));
}

#[tokio::test]
async fn test_arithmetic_type_errors() {
    assert!(matches!(
        eval("true * 2", empty()).await,
        Err(Error::Eval(EvalError::TypeError(_)))
    ));
    assert!(matches!(
        eval("-'a'", empty()).await,
        Err(Error::Eval(EvalError::TypeError(_)))
    ));
}

// ============================================================================
// Comparison and membership
// ============================================================================

#[tokio::test]
async fn test_comparisons() {
    let ctx = normandy();
    assert_eq!(eval_ok("normandy.versionMajor >= 60", ctx.clone()).await, Value::Boolean(true));
    assert_eq!(eval_ok("normandy.locale == 'en-US'", ctx.clone()).await, Value::Boolean(true));
    assert_eq!(eval_ok("normandy.locale != 'en-US'", ctx.clone()).await, Value::Boolean(false));
    assert_eq!(eval_ok("'abc' < 'abd'", ctx.clone()).await, Value::Boolean(true));
    assert_eq!(eval_ok("1 == 1.0", ctx).await, Value::Boolean(true));
}

#[tokio::test]
async fn test_missing_values_compare_false() {
    assert_eq!(eval_ok("missing.field == 3", empty()).await, Value::Boolean(false));
    assert_eq!(eval_ok("missing.field > 3", empty()).await, Value::Boolean(false));
    assert_eq!(eval_ok("missing.field < 3", empty()).await, Value::Boolean(false));
    assert_eq!(eval_ok("missing == null", empty()).await, Value::Boolean(true));
}

#[tokio::test]
async fn test_mismatched_comparison_is_type_error() {
    assert!(matches!(
        eval("'10' > 9", empty()).await,
        Err(Error::Eval(EvalError::TypeError(_)))
    ));
}

#[tokio::test]
async fn test_in_operator() {
    let ctx = normandy();
    assert_eq!(
        eval_ok("normandy.channel in ['beta', 'nightly']", ctx.clone()).await,
        Value::Boolean(true)
    );
    assert_eq!(eval_ok("'de' in normandy.locales", ctx.clone()).await, Value::Boolean(true));
    assert_eq!(eval_ok("'120' in normandy.version", ctx.clone()).await, Value::Boolean(true));
    assert_eq!(
        eval_ok("'browser.startup.page' in normandy.prefs", ctx.clone()).await,
        Value::Boolean(true)
    );
    assert_eq!(eval_ok("'x' in normandy.missing", ctx).await, Value::Boolean(false));
}

// ============================================================================
// Logic and conditionals
// ============================================================================

#[tokio::test]
async fn test_logical_operators_yield_operands() {
    assert_eq!(eval_ok("missing || 'fallback'", empty()).await, Value::from("fallback"));
    assert_eq!(eval_ok("0 && 1", empty()).await, Value::Integer(0));
    assert_eq!(eval_ok("'a' && 'b'", empty()).await, Value::from("b"));
    assert_eq!(eval_ok("!missing", empty()).await, Value::Boolean(true));
}

#[tokio::test]
async fn test_short_circuit_skips_right_side() {
    assert_eq!(eval_ok("false && 1 / 0", empty()).await, Value::Boolean(false));
    assert_eq!(eval_ok("true || 1 / 0", empty()).await, Value::Boolean(true));
    assert_eq!(eval_ok("false && 1|notRegistered", empty()).await, Value::Boolean(false));
}

#[tokio::test]
async fn test_conditional_evaluates_one_branch() {
    assert_eq!(eval_ok("true ? 1 : (1/0)", empty()).await, Value::Integer(1));
    assert_eq!(eval_ok("false ? (1/0) : 2", empty()).await, Value::Integer(2));
    assert_eq!(
        eval_ok("normandy.isFirstRun ? 'new' : 'returning'", normandy()).await,
        Value::from("returning")
    );
}

#[tokio::test]
async fn test_truthiness() {
    for source in ["[] ? 1 : 0", "{} ? 1 : 0", "'0' ? 1 : 0"] {
        assert_eq!(eval_ok(source, empty()).await, Value::Integer(1), "{}", source);
    }
    for source in ["'' ? 1 : 0", "0 ? 1 : 0", "0.0 ? 1 : 0", "null ? 1 : 0"] {
        assert_eq!(eval_ok(source, empty()).await, Value::Integer(0), "{}", source);
    }
}

// ============================================================================
// Identifiers and filters
// ============================================================================

#[tokio::test]
async fn test_identifier_lookup() {
    let ctx = normandy();
    assert_eq!(eval_ok("normandy.recipe.id", ctx.clone()).await, Value::Integer(42));
    assert_eq!(
        eval_ok("normandy.recipe.arguments.slug", ctx.clone()).await,
        Value::from("test-study")
    );
    assert_eq!(eval_ok("normandy.nothing.deeper.still", ctx.clone()).await, Value::Null);
    assert_eq!(eval_ok("normandy.channel.length", ctx).await, Value::Null);
}

#[tokio::test]
async fn test_attribute_of_array_reads_first_element() {
    assert_eq!(
        eval_ok("normandy.addons.id", normandy()).await,
        Value::from("a@mozilla.org")
    );
}

#[tokio::test]
async fn test_relative_filter() {
    let ctx = normandy();
    assert_eq!(
        eval_ok("normandy.addons[.active == true].id", ctx.clone()).await,
        Value::from("a@mozilla.org")
    );
    assert_eq!(
        eval_ok("normandy.addons[.active]|mapToProperty('id')", ctx.clone()).await,
        Value::from(json!(["a@mozilla.org", "c@mozilla.org"]))
    );
    assert_eq!(
        eval_ok("normandy.addons[.id == 'none@mozilla.org']", ctx.clone()).await,
        Value::Array(vec![])
    );
    assert_eq!(eval_ok("normandy.missing[.id == 1]", ctx).await, Value::Null);
}

#[tokio::test]
async fn test_relative_filter_over_scalar_is_type_error() {
    assert!(matches!(
        eval("normandy.channel[.id == 1]", normandy()).await,
        Err(Error::Eval(EvalError::TypeError(_)))
    ));
}

#[tokio::test]
async fn test_relative_filter_can_reach_context() {
    let ctx = Value::from(json!({
        "wanted": "b",
        "items": [{"name": "a"}, {"name": "b"}]
    }));
    assert_eq!(
        eval_ok("items[.name == wanted][0].name", ctx).await,
        Value::from("b")
    );
}

#[tokio::test]
async fn test_static_filter() {
    let ctx = normandy();
    assert_eq!(eval_ok("normandy.locales[0]", ctx.clone()).await, Value::from("en-US"));
    assert_eq!(eval_ok("normandy.locales[-1]", ctx.clone()).await, Value::from("fr"));
    assert_eq!(eval_ok("normandy.locales[1.9]", ctx.clone()).await, Value::from("de"));
    assert_eq!(eval_ok("normandy.locales[3]", ctx.clone()).await, Value::Null);
    assert_eq!(
        eval_ok("normandy.prefs['browser.startup.page']", ctx.clone()).await,
        Value::Integer(3)
    );
    assert_eq!(eval_ok("normandy.prefs[1]", ctx.clone()).await, Value::from("one"));
    assert_eq!(eval_ok("normandy.channel[0]", ctx.clone()).await, Value::from("b"));
    assert_eq!(eval_ok("normandy.missing[0]", ctx).await, Value::Null);
}

#[tokio::test]
async fn test_relative_identifier_outside_filter_reads_context() {
    assert_eq!(eval_ok(".a + 1", Value::from(json!({"a": 1}))).await, Value::Integer(2));
}

// ============================================================================
// Literals
// ============================================================================

#[tokio::test]
async fn test_array_and_object_literals() {
    let ctx = normandy();
    assert_eq!(
        eval_ok("[normandy.userId, normandy.recipe.id]", ctx.clone()).await,
        Value::from(json!(["user-1", 42]))
    );

    let object = eval_ok("{z: 1, a: normandy.channel, 'm-n': [1, 2]}", ctx).await;
    let Value::Object(map) = object else {
        panic!("expected object");
    };
    assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a", "m-n"]);
    assert_eq!(map["a"], Value::from("beta"));
}

// ============================================================================
// Transforms
// ============================================================================

#[tokio::test]
async fn test_unknown_transform() {
    assert_eq!(
        eval("1|notRegistered", empty()).await,
        Err(Error::Eval(EvalError::UnknownTransform("notRegistered".to_string())))
    );
}

#[tokio::test]
async fn test_sampling_transforms_match_sampling_module() {
    let ctx = normandy();
    let expected = targex::sampling::stable_sample("user-1", 0.5).unwrap();
    assert_eq!(
        eval_ok("normandy.userId|stableSample(0.5)", ctx.clone()).await,
        Value::Boolean(expected)
    );

    let expected = targex::sampling::bucket_sample(r#"["user-1",42]"#, 0, 5000, 10000).unwrap();
    assert_eq!(
        eval_ok(
            "[normandy.userId, normandy.recipe.id]|bucketSample(0, 5000, 10000)",
            ctx
        )
        .await,
        Value::Boolean(expected)
    );
}

#[tokio::test]
async fn test_sampling_rate_out_of_range() {
    assert!(matches!(
        eval("'x'|stableSample(1.5)", empty()).await,
        Err(Error::Eval(EvalError::Sampling(_)))
    ));
}

// ============================================================================
// Compiled expressions and matching
// ============================================================================

#[tokio::test]
async fn test_compiled_expression_is_reusable() {
    let expression = compile("normandy.versionMajor >= min").unwrap();
    let transforms = Transforms::new();

    let old = Value::from(json!({"normandy": {"versionMajor": 50}, "min": 60}));
    let new = Value::from(json!({"normandy": {"versionMajor": 70}, "min": 60}));
    assert_eq!(expression.evaluate(&old, &transforms).await, Ok(Value::Boolean(false)));
    assert_eq!(expression.evaluate(&new, &transforms).await, Ok(Value::Boolean(true)));
    assert_eq!(expression.source(), "normandy.versionMajor >= min");
}

#[tokio::test]
async fn test_compile_errors_surface_before_evaluation() {
    assert!(matches!(compile("a # b"), Err(Error::Lex(_))));
    assert!(matches!(compile("a +"), Err(Error::Parse(_))));
    assert!(matches!("(a".parse::<targex::Expression>(), Err(Error::Parse(_))));
}

#[tokio::test]
async fn test_matches_fails_closed() {
    let transforms = Transforms::standard();
    let ctx = normandy();
    assert!(matches("normandy.channel == 'beta'", &ctx, &transforms).await);
    assert!(!matches("normandy.channel == 'release'", &ctx, &transforms).await);
    assert!(!matches("normandy.channel ==", &ctx, &transforms).await);
    assert!(!matches("1 / 0", &ctx, &transforms).await);
    assert!(!matches("1|notRegistered", &ctx, &transforms).await);
    assert!(matches("normandy.addons[.active]", &ctx, &transforms).await);

    let nested = format!("{}true{}", "(".repeat(10_000), ")".repeat(10_000));
    assert!(!matches(&nested, &ctx, &transforms).await);
}
