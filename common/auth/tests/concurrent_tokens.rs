use std::collections::HashSet;
use std::sync::Arc;

use api_auth::{
    ClaimSet, JwtAuth, KeySource, SigningMaterial, TokenConfiguration, TokenValidation, TokenValidator,
};

fn material() -> SigningMaterial {
    SigningMaterial::load(&KeySource::Secret("concurrency-secret-0123456789abcdef".into()))
        .expect("secret loads")
}

fn config() -> TokenConfiguration {
    TokenConfiguration::new("app", "app-clients", 3600)
}

fn auth() -> JwtAuth {
    JwtAuth::new(config(), material()).expect("config")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn thousand_identities_issue_and_validate_independently() {
    let auth = auth();
    let issuer = auth.issuer();

    let mut issuing = Vec::with_capacity(1000);
    for index in 0..1000 {
        let issuer = Arc::clone(&issuer);
        issuing.push(tokio::spawn(async move {
            let subject = format!("user-{index}");
            let claims = ClaimSet::new(subject.clone())
                .with_claim("index", index)
                .unwrap();
            let issued = issuer.issue(&claims).expect("issue");
            (subject, index, issued.access_token)
        }));
    }

    let mut tokens = Vec::with_capacity(1000);
    for handle in issuing {
        tokens.push(handle.await.expect("issuing task"));
    }

    let validator = Arc::new(TokenValidator::new(config(), material()));
    let mut validating = Vec::with_capacity(1000);
    for (subject, index, token) in tokens {
        let validator = Arc::clone(&validator);
        validating.push(tokio::spawn(async move {
            let principal = validator.validate(&token).expect("valid");
            (subject, index, principal)
        }));
    }

    let mut subjects = HashSet::new();
    for handle in validating {
        let (subject, index, principal) = handle.await.expect("validating task");
        assert!(principal.authenticated);
        assert_eq!(principal.subject(), subject);
        assert_eq!(principal.claim("index"), Some(&serde_json::json!(index)));
        assert_eq!(principal.claims.len(), 2);
        subjects.insert(subject);
    }
    assert_eq!(subjects.len(), 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gate_decisions_do_not_interfere() {
    let auth = auth();
    let gate = auth.gate();

    let mut handles = Vec::new();
    for index in 0..200 {
        let gate = Arc::clone(&gate);
        let token = auth
            .issuer()
            .issue(&ClaimSet::new(format!("user-{index}")))
            .expect("issue")
            .access_token;
        handles.push(tokio::spawn(async move {
            let header = if index % 2 == 0 {
                Some(format!("Bearer {token}"))
            } else {
                None
            };
            (index, gate.authorize(header.as_deref()))
        }));
    }

    for handle in handles {
        let (index, outcome) = handle.await.expect("task");
        if index % 2 == 0 {
            assert_eq!(outcome.expect("authorized").subject(), format!("user-{index}"));
        } else {
            assert!(outcome.is_err());
        }
    }
}
