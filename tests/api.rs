mod common;

use axum::http::{header, StatusCode};
use tower::ServiceExt;

use common::*;
use docsync::answer::FALLBACK_ANSWER;
use docsync::summarize::UNAVAILABLE;

const TERMS_V1: &[u8] = b"Terms of service. Payment is due at signup. No refunds are offered.";
const TERMS_V2: &[u8] =
    b"Terms of service. Payment is due at signup. Refunds are allowed within 30 days.";
const CODE_V1: &[u8] = b"def parse(path):\n    return open(path).read()\n";
const CODE_V2: &[u8] = b"def load(path):\n    with open(path) as f:\n        return f.read()\n";

#[tokio::test]
async fn root_and_health_respond() {
    let t = test_app(StubModel::working());

    let resp = t.app.clone().oneshot(get_request("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["msg"], "DocSyncAI backend");

    let resp = t.app.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn two_python_files_get_code_summary_only() {
    let t = test_app(StubModel::working());

    let resp = t
        .app
        .clone()
        .oneshot(process_request(&[("old.py", CODE_V1), ("new.py", CODE_V2)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["processed"], true);
    assert_eq!(json["file_names"], serde_json::json!(["old.py", "new.py"]));
    assert_eq!(json["code_combined_summary"], CODE_SUMMARY);
    assert!(json["diff_summary"].is_null());

    // Code comparisons never embed anything.
    assert!(!t.index_root.path().join("faiss_index_1").exists());
    let prompts = t.model.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Code File 1 (old.py):"));
}

#[tokio::test]
async fn two_documents_get_diff_summary_and_indexes() {
    let t = test_app(StubModel::working());

    let resp = t
        .app
        .clone()
        .oneshot(process_request(&[("v1.txt", TERMS_V1), ("v2.md", TERMS_V2)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["diff_summary"], DOCUMENT_SUMMARY);
    assert!(json["code_combined_summary"].is_null());
    assert!(t.index_root.path().join("faiss_index_1/index.json").exists());
    assert!(t.index_root.path().join("faiss_index_2/index.json").exists());
}

#[tokio::test]
async fn python_and_text_pair_is_a_document_comparison() {
    let t = test_app(StubModel::working());

    let resp = t
        .app
        .clone()
        .oneshot(process_request(&[("a.py", CODE_V1), ("b.txt", TERMS_V1)]))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert_eq!(json["diff_summary"], DOCUMENT_SUMMARY);
    assert!(json["code_combined_summary"].is_null());
}

#[tokio::test]
async fn unsupported_only_upload_is_rejected() {
    let t = test_app(StubModel::working());

    let resp = t
        .app
        .clone()
        .oneshot(process_request(&[("setup.exe", &b"MZ\x90\x00"[..])]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["code"], "bad_request");
    assert_eq!(t.model.calls(), 0);
}

#[tokio::test]
async fn empty_upload_is_rejected() {
    let t = test_app(StubModel::working());

    let resp = t.app.clone().oneshot(process_request(&[])).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["message"], "No files uploaded");
}

#[tokio::test]
async fn three_supported_files_are_rejected() {
    let t = test_app(StubModel::working());

    let resp = t
        .app
        .clone()
        .oneshot(process_request(&[
            ("a.txt", TERMS_V1),
            ("b.txt", TERMS_V2),
            ("c.txt", TERMS_V1),
        ]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unsupported_file_beside_a_supported_one_is_skipped() {
    let t = test_app(StubModel::working());

    let resp = t
        .app
        .clone()
        .oneshot(process_request(&[("notes.txt", TERMS_V1), ("tool.exe", &b"MZ"[..])]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["file_names"], serde_json::json!(["notes.txt"]));
    assert!(t.index_root.path().join("faiss_index/index.json").exists());
}

#[tokio::test]
async fn chat_before_process_is_rejected() {
    let t = test_app(StubModel::working());

    let resp = t
        .app
        .clone()
        .oneshot(chat_request("What changed?", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(
        json["error"]["message"],
        "No files processed. Please /process files first."
    );
    assert_eq!(t.model.calls(), 0);
}

#[tokio::test]
async fn blank_question_is_rejected() {
    let t = test_app(StubModel::working());
    t.app
        .clone()
        .oneshot(process_request(&[("terms.txt", TERMS_V2)]))
        .await
        .unwrap();

    let resp = t
        .app
        .clone()
        .oneshot(chat_request("   \n", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["message"], "Question is empty");
}

#[tokio::test]
async fn single_file_chat_retrieves_from_its_index() {
    let t = test_app(StubModel::working());

    let resp = t
        .app
        .clone()
        .oneshot(process_request(&[("terms.txt", TERMS_V2)]))
        .await
        .unwrap();
    let json = body_json(resp).await;
    assert!(json["diff_summary"].is_null());
    assert!(json["code_combined_summary"].is_null());
    assert!(t.index_root.path().join("faiss_index/index.json").exists());
    // Single files are indexed, not summarized.
    assert_eq!(t.model.calls(), 0);

    let resp = t
        .app
        .clone()
        .oneshot(chat_request("Are refunds allowed?", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["answer"], ANSWER);

    assert_eq!(
        *t.embedder.queries.lock().unwrap(),
        vec!["Are refunds allowed?".to_string()]
    );
    let prompts = t.model.prompts.lock().unwrap();
    assert!(prompts[0].contains("Files processed: terms.txt"));
    assert!(prompts[0].contains("Question:\nAre refunds allowed?"));
}

#[tokio::test]
async fn chat_with_unknown_selected_file_still_answers() {
    let t = test_app(StubModel::working());
    t.app
        .clone()
        .oneshot(process_request(&[("v1.txt", TERMS_V1), ("v2.txt", TERMS_V2)]))
        .await
        .unwrap();

    let resp = t
        .app
        .clone()
        .oneshot(chat_request("Are refunds allowed?", Some("missing.txt")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["answer"], ANSWER);
    // No index to search, so the query is never embedded.
    assert!(t.embedder.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failing_model_degrades_instead_of_erroring() {
    let t = test_app(StubModel::failing());

    let resp = t
        .app
        .clone()
        .oneshot(process_request(&[("old.py", CODE_V1), ("new.py", CODE_V2)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["code_combined_summary"], UNAVAILABLE);
    assert_eq!(t.model.calls(), 3);

    let resp = t
        .app
        .clone()
        .oneshot(chat_request("What changed?", Some("All")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["answer"], FALLBACK_ANSWER);
    // Chat is a single attempt.
    assert_eq!(t.model.calls(), 4);
}

#[tokio::test]
async fn report_before_process_is_rejected() {
    let t = test_app(StubModel::working());

    let resp = t.app.clone().oneshot(get_request("/report")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn code_report_has_only_code_section() {
    let t = test_app(StubModel::working());
    t.app
        .clone()
        .oneshot(process_request(&[("old.py", CODE_V1), ("new.py", CODE_V2)]))
        .await
        .unwrap();

    let resp = t.app.clone().oneshot(get_request("/report")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"DocSyncAI_Report.txt\""
    );

    let text = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(text.starts_with("DocSyncAI Diff Report\n"));
    assert!(text.contains("Files Compared: old.py vs new.py"));
    assert!(text.contains(&format!("Code Combined Diff Summary:\n{}", CODE_SUMMARY)));
    assert!(!text.contains("Document Diff Summary:"));
    // Summaries are regenerated for the report.
    assert_eq!(t.model.calls(), 2);
}

#[tokio::test]
async fn single_file_report_notes_no_diff() {
    let t = test_app(StubModel::working());
    t.app
        .clone()
        .oneshot(process_request(&[("terms.txt", TERMS_V1)]))
        .await
        .unwrap();

    let resp = t.app.clone().oneshot(get_request("/report")).await.unwrap();
    let text = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(text.contains("Document Diff Summary:\nSingle file processed. No diff available."));
    assert!(!text.contains("Files Compared"));
}

#[tokio::test]
async fn failed_process_clears_previous_session() {
    let t = test_app(StubModel::working());
    t.app
        .clone()
        .oneshot(process_request(&[("terms.txt", TERMS_V1)]))
        .await
        .unwrap();

    let resp = t
        .app
        .clone()
        .oneshot(process_request(&[("setup.exe", &b"MZ"[..])]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = t
        .app
        .clone()
        .oneshot(chat_request("Anything?", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_embedding_spares_the_sibling_index() {
    let t = test_app_with(StubModel::working(), LetterEmbedder::failing_on("FAIL"));

    let resp = t
        .app
        .clone()
        .oneshot(process_request(&[
            ("a.txt", &b"FAIL here"[..]),
            ("b.txt", &b"fine text"[..]),
        ]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["diff_summary"], DOCUMENT_SUMMARY);

    assert!(!t.index_root.path().join("faiss_index_1").exists());
    assert!(t.index_root.path().join("faiss_index_2/index.json").exists());
    assert_eq!(
        t.session.read().await.index_names(),
        ["faiss_index_1".to_string(), "faiss_index_2".to_string()]
    );

    let resp = t
        .app
        .clone()
        .oneshot(chat_request("Is the text fine?", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["answer"], ANSWER);
}
