//! Failure injection tests: broken lambdas must never take the server down.

use axum::http::StatusCode;

mod common;

use common::{client, start, Project};

const HEALTHY: &str = "module.exports = (req, res) => res.end('ok');";

async fn assert_still_serving(server: &common::TestServer) {
    let res = client().get(server.url("/api/healthy")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn test_syntax_error_is_500_and_recoverable() {
    let project = Project::with_routes("[]");
    project.write("api/healthy.js", HEALTHY);
    project.write("api/typo.js", "module.exports = (req, res) => { res.end('x' ;");
    let server = start(&project).await;

    let res = client().get(server.url("/api/typo")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_still_serving(&server).await;

    project.write("api/typo.js", "module.exports = (req, res) => res.end('fixed');");
    let res = client().get(server.url("/api/typo")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "fixed");
}

#[tokio::test]
async fn test_top_level_throw_is_500() {
    let project = Project::with_routes("[]");
    project.write("api/healthy.js", HEALTHY);
    project.write("api/boot.js", "throw new Error('cannot start');");
    let server = start(&project).await;

    let res = client().get(server.url("/api/boot")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_still_serving(&server).await;
}

#[tokio::test]
async fn test_thrown_non_error_values() {
    let project = Project::with_routes("[]");
    project.write("api/healthy.js", HEALTHY);
    project.write("api/string.js", "module.exports = () => { throw 'plain string'; };");
    project.write(
        "api/status.js",
        "module.exports = async () => { throw { status: 409, message: 'conflict' }; };",
    );
    let server = start(&project).await;

    let res = client().get(server.url("/api/string")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let res = client().get(server.url("/api/status")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(res.text().await.unwrap(), "conflict");

    assert_still_serving(&server).await;
}

#[tokio::test]
async fn test_unfinished_response_is_completed() {
    let project = Project::with_routes("[]");
    project.write(
        "api/forgetful.js",
        "module.exports = (req, res) => { res.statusCode = 202; res.write('accepted'); };",
    );
    project.write(
        "api/pending.js",
        "module.exports = () => new Promise(() => {});",
    );
    let server = start(&project).await;

    let res = client().get(server.url("/api/forgetful")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert_eq!(res.text().await.unwrap(), "accepted");

    let res = client().get(server.url("/api/pending")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "");
}

#[tokio::test]
async fn test_invalid_status_from_lambda() {
    let project = Project::with_routes("[]");
    project.write("api/healthy.js", HEALTHY);
    project.write(
        "api/weird.js",
        "module.exports = (req, res) => { res.statusCode = 42; res.end('odd'); };",
    );
    let server = start(&project).await;

    let res = client().get(server.url("/api/weird")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_still_serving(&server).await;
}

#[tokio::test]
async fn test_bad_require_is_500_and_recoverable() {
    let project = Project::with_routes("[]");
    project.write("api/healthy.js", HEALTHY);
    project.write(
        "api/needy.js",
        "const dep = require('./missing'); module.exports = (req, res) => res.end(dep);",
    );
    project.write(
        "api/escape.js",
        "const pw = require('../../../../etc/passwd'); module.exports = () => pw;",
    );
    let server = start(&project).await;

    let res = client().get(server.url("/api/needy")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let res = client().get(server.url("/api/escape")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_still_serving(&server).await;

    project.write("api/missing.js", "module.exports = 'found';");
    let res = client().get(server.url("/api/needy")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "found");
}
