#[cfg(test)]
mod tests {
    use crust::{
        json_subset, Check, CheckPolicy, HarnessConfiguration, MockRegistry, Predicate, RouteMock,
        RunState, Runner, Scenario, Step, ThinkTime,
    };
    use jwt_pizza_load::pizza::{
        create_franchise_mock, delete_franchise_mock, franchise_list_mock, login_mock,
        logout_mock, menu_mock, purchase_mock, register_mock, user_franchises_mock,
    };
    use serde_json::json;
    use std::{sync::Arc, time::Duration};

    const SERVICE: &str = "https://pizza-service.test";

    fn mock_configuration(registry: &Arc<MockRegistry>) -> HarnessConfiguration {
        let mut configuration = HarnessConfiguration::new(CheckPolicy::FailFast);
        configuration.set_variable("api_url", SERVICE);
        configuration.set_http_client(registry.clone());
        configuration.set_think_time_override(ThinkTime::None);
        configuration
    }

    fn login_step() -> Step {
        Step::new("login", "PUT", "${api_url}/api/auth")
            .header("content-type", "application/json")
            .body(r#"{"email":"d@jwt.com","password":"a"}"#)
            .check(Check::critical(
                "Login was not 200",
                Predicate::StatusEquals(200),
            ))
    }

    #[tokio::test]
    async fn matching_mock_answers_and_never_hits_the_network() {
        let mut registry = MockRegistry::new();
        registry
            .register(
                "*/api/order/menu",
                "GET",
                RouteMock::respond_json(
                    200,
                    json!([
                        { "id": 1, "title": "Veggie", "price": 0.0038 },
                        { "id": 2, "title": "Pepperoni", "price": 0.0042 }
                    ]),
                ),
            )
            .unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("menu").step(
            Step::new("get menu", "GET", "${api_url}/api/order/menu")
                .check(Check::new(
                    "menu lists the veggie pizza",
                    Predicate::BodyContains(String::from("Veggie")),
                ))
                .check(Check::new(
                    "menu is served as json",
                    Predicate::HeaderContains(
                        String::from("content-type"),
                        String::from("application/json"),
                    ),
                ))
                .check(Check::new(
                    "veggie pizza costs 0.0038",
                    Predicate::JsonSubset(json!([
                        { "id": 1, "title": "Veggie", "price": 0.0038 },
                        { "id": 2, "title": "Pepperoni", "price": 0.0042 }
                    ])),
                )),
        );

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Passed);
        assert_eq!(registry.hits("*/api/order/menu", "GET"), 1);
    }

    #[tokio::test]
    async fn unmocked_call_fails_without_a_fallback() {
        let registry = Arc::new(MockRegistry::new());

        let scenario = Scenario::new("stray")
            .step(Step::new("unexpected call", "GET", "${api_url}/api/unknown"));

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Failed);
        assert!(report.failure.unwrap().contains("no mock registered"));
    }

    #[tokio::test]
    async fn body_mismatch_names_the_offending_field() {
        let mut registry = MockRegistry::new();
        registry.register("*/api/auth", "PUT", login_mock()).unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("bad password").step(
            Step::new("login", "PUT", "${api_url}/api/auth")
                .body(r#"{"email":"d@jwt.com","password":"wrong"}"#),
        );

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Failed);
        let failure = report.failure.unwrap();
        assert!(failure.contains("$.password"), "failure was: {}", failure);
    }

    #[tokio::test]
    async fn failed_login_aborts_before_the_menu_step() {
        let mut registry = MockRegistry::new();
        registry
            .register(
                "*/api/auth",
                "PUT",
                RouteMock::respond_json(401, json!({ "message": "unknown user" })),
            )
            .unwrap();
        registry
            .register("*/api/order/menu", "GET", RouteMock::respond_json(200, json!([])))
            .unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("login and browse")
            .step(login_step())
            .step(Step::new("get menu", "GET", "${api_url}/api/order/menu"));

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.failure.as_deref(), Some("Login was not 200"));
        assert_eq!(report.steps.len(), 1);
        assert_eq!(registry.hits("*/api/order/menu", "GET"), 0);
    }

    #[tokio::test]
    async fn successful_login_proceeds_to_the_menu_step() {
        let mut registry = MockRegistry::new();
        registry.register("*/api/auth", "PUT", login_mock()).unwrap();
        registry
            .register("*/api/order/menu", "GET", RouteMock::respond_json(200, json!([])))
            .unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("login and browse")
            .step(login_step())
            .step(Step::new("get menu", "GET", "${api_url}/api/order/menu"));

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Passed);
        assert_eq!(registry.hits("*/api/order/menu", "GET"), 1);
    }

    #[tokio::test]
    async fn order_jwt_is_available_to_the_verification_step() {
        let mut registry = MockRegistry::new();
        registry
            .register(
                "*/api/order",
                "POST",
                RouteMock::respond_json(
                    200,
                    json!({
                        "order": {
                            "items": [{ "menuId": 1, "description": "Veggie", "price": 0.0038 }],
                            "storeId": "1",
                            "franchiseId": 1,
                            "id": 23
                        },
                        "jwt": "eyJpYXQ"
                    }),
                )
                .expect_body(json!({
                    "items": [{ "menuId": 1, "description": "Veggie", "price": 0.0038 }],
                    "storeId": "1",
                    "franchiseId": 1
                })),
            )
            .unwrap();
        registry
            .register(
                "*/api/order/verify",
                "POST",
                RouteMock::respond_json(200, json!({ "message": "valid" }))
                    .expect_body(json!({ "jwt": "eyJpYXQ" })),
            )
            .unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("order and verify")
            .step(
                Step::new("order pizza", "POST", "${api_url}/api/order")
                    .body(
                        r#"{"items":[{"menuId":1,"description":"Veggie","price":0.0038}],"storeId":"1","franchiseId":1}"#,
                    )
                    .extract("jwt", "/jwt"),
            )
            .step(
                Step::new("verify pizza", "POST", "${api_url}/api/order/verify")
                    .body(r#"{"jwt":"${jwt}"}"#),
            );

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Passed);
        assert_eq!(report.variables.get("jwt").map(String::as_str), Some("eyJpYXQ"));
        assert_eq!(registry.hits("*/api/order/verify", "POST"), 1);
    }

    #[tokio::test]
    async fn franchise_deletion_requires_a_bearer_token() {
        let mut registry = MockRegistry::new();
        registry
            .register("*/api/franchise/*", "DELETE", delete_franchise_mock())
            .unwrap();
        let registry = Arc::new(registry);

        let anonymous = Scenario::new("delete franchise anonymously")
            .step(Step::new("delete franchise", "DELETE", "${api_url}/api/franchise/2"));
        let report = Runner::new(mock_configuration(&registry)).run(&anonymous).await;

        assert_eq!(report.state, RunState::Failed);
        assert!(report.failure.unwrap().contains("authorization"));

        let authorized = Scenario::new("delete franchise").step(
            Step::new("delete franchise", "DELETE", "${api_url}/api/franchise/2")
                .header("authorization", "Bearer abcdef"),
        );
        let report = Runner::new(mock_configuration(&registry)).run(&authorized).await;

        assert_eq!(report.state, RunState::Passed);
        assert_eq!(registry.hits("*/api/franchise/*", "DELETE"), 1);
    }

    #[tokio::test]
    async fn registration_token_authorizes_the_logout_call() {
        let mut registry = MockRegistry::new();
        registry.register("*/api/auth", "POST", register_mock()).unwrap();
        registry.register("*/api/auth", "DELETE", logout_mock()).unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("register and logout")
            .step(
                Step::new("register", "POST", "${api_url}/api/auth")
                    .header("content-type", "application/json")
                    .body(
                        r#"{"name":"Johnny Cash","email":"johnnycash@gmail.com","password":"1234"}"#,
                    )
                    .check(Check::new(
                        "registration returns the new diner",
                        Predicate::JsonSubset(json!({ "user": { "id": 145, "name": "Johnny Cash" } })),
                    ))
                    .extract("token", "/token"),
            )
            .step(
                Step::new("logout", "DELETE", "${api_url}/api/auth")
                    .header("authorization", "Bearer ${token}")
                    .check(Check::new(
                        "logout confirms",
                        Predicate::BodyContains(String::from("logout successful")),
                    )),
            );

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Passed);
        let token = report.variables.get("token").cloned().unwrap_or_default();
        assert!(token.starts_with("eyJhbGci"), "token was: {}", token);
        assert_eq!(registry.hits("*/api/auth", "DELETE"), 1);
    }

    #[tokio::test]
    async fn logout_without_a_token_is_rejected() {
        let mut registry = MockRegistry::new();
        registry.register("*/api/auth", "DELETE", logout_mock()).unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("logout anonymously")
            .step(Step::new("logout", "DELETE", "${api_url}/api/auth"));

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Failed);
        assert!(report.failure.unwrap().contains("authorization"));
    }

    #[tokio::test]
    async fn franchisee_dashboard_lists_owned_franchises() {
        let mut registry = MockRegistry::new();
        registry
            .register("*/api/franchise/*", "GET", user_franchises_mock())
            .unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("franchisee dashboard").step(
            Step::new("get owned franchises", "GET", "${api_url}/api/franchise/145")
                .header("authorization", "Bearer abcdef")
                .check(Check::new(
                    "dashboard shows the SLC store",
                    Predicate::JsonSubset(
                        json!([{ "name": "pizzaPocket", "stores": [{ "name": "SLC" }] }]),
                    ),
                )),
        );

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Passed);
        assert_eq!(registry.hits("*/api/franchise/*", "GET"), 1);
    }

    #[tokio::test]
    async fn franchise_creation_requires_a_bearer_token_and_the_payload() {
        let mut registry = MockRegistry::new();
        registry
            .register("*/api/franchise", "POST", create_franchise_mock())
            .unwrap();
        let registry = Arc::new(registry);

        let body =
            r#"{"stores":[],"name":"ThisFranchise3","admins":[{"email":"benji@jwt.com"}]}"#;

        let anonymous = Scenario::new("create franchise anonymously")
            .step(Step::new("create franchise", "POST", "${api_url}/api/franchise").body(body));
        let report = Runner::new(mock_configuration(&registry)).run(&anonymous).await;

        assert_eq!(report.state, RunState::Failed);
        assert!(report.failure.unwrap().contains("authorization"));

        let authorized = Scenario::new("create franchise").step(
            Step::new("create franchise", "POST", "${api_url}/api/franchise")
                .header("authorization", "Bearer abcdef")
                .body(body)
                .check(Check::new(
                    "creation returns the franchise id",
                    Predicate::JsonSubset(json!({ "id": 24 })),
                )),
        );
        let report = Runner::new(mock_configuration(&registry)).run(&authorized).await;

        assert_eq!(report.state, RunState::Passed);
        assert_eq!(registry.hits("*/api/franchise", "POST"), 1);
    }

    #[tokio::test]
    async fn checkout_flow_runs_over_the_canned_pack() {
        let mut registry = MockRegistry::new();
        registry.register("*/api/order/menu", "GET", menu_mock()).unwrap();
        registry
            .register("*/api/franchise", "GET", franchise_list_mock())
            .unwrap();
        registry.register("*/api/auth", "PUT", login_mock()).unwrap();
        registry.register("*/api/order", "POST", purchase_mock()).unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("checkout")
            .step(
                Step::new("get menu", "GET", "${api_url}/api/order/menu").check(Check::new(
                    "menu lists the pepperoni pizza",
                    Predicate::BodyContains(String::from("Pepperoni")),
                )),
            )
            .step(
                Step::new("get franchises", "GET", "${api_url}/api/franchise").check(Check::new(
                    "lehi store is available",
                    Predicate::BodyContains(String::from("Lehi")),
                )),
            )
            .step(login_step().extract("token", "/token"))
            .step(
                Step::new("order two pizzas", "POST", "${api_url}/api/order")
                    .header("authorization", "Bearer ${token}")
                    .body(
                        r#"{"items":[{"menuId":1,"description":"Veggie","price":0.0038},{"menuId":2,"description":"Pepperoni","price":0.0042}],"storeId":"4","franchiseId":2}"#,
                    )
                    .check(Check::new(
                        "order is recorded",
                        Predicate::JsonSubset(json!({ "order": { "id": 23 } })),
                    ))
                    .extract("jwt", "/jwt"),
            );

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Passed);
        assert_eq!(report.variables.get("jwt").map(String::as_str), Some("eyJpYXQ"));
        assert_eq!(registry.hits("*/api/order", "POST"), 1);
    }

    #[tokio::test]
    async fn failed_runs_keep_the_variables_captured_so_far() {
        let mut registry = MockRegistry::new();
        registry.register("*/api/auth", "PUT", login_mock()).unwrap();
        let registry = Arc::new(registry);

        // the verification route is not mocked, so the second step fails
        let scenario = Scenario::new("login then stray call")
            .step(login_step().extract("token", "/token"))
            .step(Step::new("verify pizza", "POST", "${api_url}/api/order/verify"));

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.variables.get("token").map(String::as_str), Some("abcdef"));
    }

    #[tokio::test]
    async fn reruns_over_the_same_mocks_are_idempotent() {
        let mut registry = MockRegistry::new();
        registry.register("*/api/auth", "PUT", login_mock()).unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("login")
            .step(login_step().extract("token", "/token"));
        let runner = Runner::new(mock_configuration(&registry));

        let first = runner.run(&scenario).await;
        let second = runner.run(&scenario).await;

        assert_eq!(first.state, RunState::Passed);
        assert_eq!(second.state, first.state);
        assert_eq!(second.steps.len(), first.steps.len());
        assert_eq!(second.variables, first.variables);
        assert_eq!(registry.hits("*/api/auth", "PUT"), 2);
    }

    #[tokio::test]
    async fn soft_policy_records_noncritical_failures_and_continues() {
        let mut registry = MockRegistry::new();
        registry
            .register(
                "*/api/franchise",
                "GET",
                RouteMock::respond_json(200, json!([{ "id": 2, "name": "LotaPizza" }])),
            )
            .unwrap();
        registry
            .register("*/api/order/menu", "GET", RouteMock::respond_json(200, json!([])))
            .unwrap();
        let registry = Arc::new(registry);

        let mut configuration = mock_configuration(&registry);
        configuration.set_check_policy(CheckPolicy::FailSoft);

        let scenario = Scenario::new("best effort browse")
            .step(
                Step::new("get franchises", "GET", "${api_url}/api/franchise").check(Check::new(
                    "franchise list mentions PizzaCorp",
                    Predicate::BodyContains(String::from("PizzaCorp")),
                )),
            )
            .step(Step::new("get menu", "GET", "${api_url}/api/order/menu"));

        let report = Runner::new(configuration).run(&scenario).await;

        assert_eq!(report.state, RunState::Passed);
        assert_eq!(report.steps.len(), 2);
        assert!(!report.steps[0].checks[0].passed);
        assert_eq!(registry.hits("*/api/order/menu", "GET"), 1);
    }

    #[tokio::test]
    async fn unknown_variable_fails_before_any_call() {
        let mut registry = MockRegistry::new();
        registry
            .register("*/api/order/verify", "POST", RouteMock::respond_json(200, json!({})))
            .unwrap();
        let registry = Arc::new(registry);

        let scenario = Scenario::new("verify without an order").step(
            Step::new("verify pizza", "POST", "${api_url}/api/order/verify")
                .body(r#"{"jwt":"${jwt}"}"#),
        );

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Failed);
        assert!(report.failure.unwrap().contains("jwt"));
        assert_eq!(registry.hits("*/api/order/verify", "POST"), 0);
    }

    #[tokio::test]
    async fn preflight_is_sent_before_the_real_call() {
        let mut registry = MockRegistry::new();
        registry
            .register(
                "*/api/auth",
                "OPTIONS",
                RouteMock::respond_json(204, json!({}))
                    .require_header("access-control-request-method", "PUT")
                    .require_header("access-control-request-headers", "content-type"),
            )
            .unwrap();
        registry.register("*/api/auth", "PUT", login_mock()).unwrap();
        let registry = Arc::new(registry);

        // the step carries only a content-type header, none of the browser
        // headers the preflight copies over
        let scenario = Scenario::new("login with preflight")
            .step(login_step().preflight("content-type"));

        let report = Runner::new(mock_configuration(&registry)).run(&scenario).await;

        assert_eq!(report.state, RunState::Passed);
        assert_eq!(registry.hits("*/api/auth", "OPTIONS"), 1);
        assert_eq!(registry.hits("*/api/auth", "PUT"), 1);
    }

    #[tokio::test]
    async fn ramping_load_run_iterates_until_rampdown() {
        let mut registry = MockRegistry::new();
        registry.register("*/api/auth", "PUT", login_mock()).unwrap();
        let registry = Arc::new(registry);

        let mut configuration = mock_configuration(&registry);
        configuration.set_check_policy(CheckPolicy::FailSoft);

        let scenario = Arc::new(Scenario::new("login").step(login_step()));
        let profile = crust::LoadProfile::new()
            .stage(2, Duration::from_millis(500))
            .stage(0, Duration::from_millis(200))
            .graceful_stop(Duration::from_secs(5));

        let summary = crust::LoadRunner::new(configuration)
            .execute(&profile, scenario)
            .await
            .unwrap();

        assert!(summary.iterations > 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.peak_vus, 2);
        assert_eq!(registry.hits("*/api/auth", "PUT") as u64, summary.passed);
    }

    #[tokio::test]
    async fn empty_load_profile_is_rejected() {
        let registry = Arc::new(MockRegistry::new());
        let scenario = Arc::new(Scenario::new("login").step(login_step()));

        let result = crust::LoadRunner::new(mock_configuration(&registry))
            .execute(&crust::LoadProfile::new(), scenario)
            .await;

        assert!(result.is_err());
    }

    #[test]
    fn json_subset_reports_the_mismatched_path() {
        let expected = serde_json::json!({
            "order": { "items": [{ "menuId": 1, "price": 0.0038 }] }
        });
        let actual = serde_json::json!({
            "order": { "items": [{ "menuId": 1, "price": 1.0 }], "id": 23 }
        });

        let message = json_subset(&expected, &actual).unwrap_err();
        assert!(message.contains("$.order.items[0].price"), "message was: {}", message);
    }

    #[test]
    fn json_subset_accepts_supersets() {
        let expected = serde_json::json!({ "user": { "email": "d@jwt.com" } });
        let actual = serde_json::json!({
            "user": { "id": 3, "email": "d@jwt.com", "roles": [{ "role": "diner" }] },
            "token": "abcdef"
        });

        assert!(json_subset(&expected, &actual).is_ok());
    }

    #[test]
    fn uniform_think_time_samples_within_bounds() {
        let think_time = ThinkTime::Uniform {
            min: Duration::from_millis(100),
            max: Duration::from_millis(200),
        };

        for _ in 0..100 {
            let pause = think_time.sample().unwrap();
            assert!(pause >= Duration::from_millis(100));
            assert!(pause <= Duration::from_millis(200));
        }
    }
}
