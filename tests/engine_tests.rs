//! End-to-end engine tests over in-memory collaborators.

mod common;

use common::{fail, harness, reply, tool_call, usage, ScriptedClient};

use colloquy::config::EngineConfig;
use colloquy::engine::INCOMPLETE_NOTICE;
use colloquy::error::ColloquyError;
use colloquy::store::{AgentStore, LogFilter, LogSink};
use colloquy::types::{AgentRecord, AgentStatus, ChatLogEntry, LogStatus, TurnRole};
use pretty_assertions::assert_eq;
use uuid::Uuid;

#[tokio::test]
async fn plain_chat_produces_success_log_and_grows_history() {
    let llm = ScriptedClient::new(vec![reply("hi there", Some(usage(10, 3, 0.0001)))]);
    let h = harness(llm, EngineConfig::default()).await;

    let agent = h
        .store
        .put(AgentRecord::new("atlas", "greeter", "You are friendly."))
        .await
        .unwrap();

    let outcome = h
        .engine
        .process_chat_message(agent.id, "hello", None)
        .await
        .unwrap();

    assert_eq!(outcome.response, "hi there");
    assert!(outcome.completed);
    assert_eq!(outcome.usage.total_tokens, 13);
    assert!(outcome.tool_calls.is_empty());
    assert!(outcome.log_id.is_some());

    // Exactly one log entry, with the scenario's expected fields.
    let logs = h.sink.query(&LogFilter::for_agent(agent.id)).await.unwrap();
    assert_eq!(logs.len(), 1);
    let entry = ChatLogEntry::from_record(&logs[0]);
    assert_eq!(entry.status, LogStatus::Success);
    assert_eq!(entry.request_message, "hello");
    assert_eq!(entry.response_message, "hi there");
    assert_eq!(entry.total_tokens, 13);
    assert!(!entry.has_tool_calls);
    assert!(!entry.has_memory);
    assert_eq!(entry.requestor_id, "administrator");
    assert_eq!(entry.model_name, "mock-model");

    // History grows by exactly two turns: the user's and the assistant's.
    let stored = h.store.get(agent.id).await.unwrap().unwrap();
    assert_eq!(stored.context.chat_history.len(), 2);
    assert_eq!(stored.context.chat_history[0].role, TurnRole::User);
    assert_eq!(stored.context.chat_history[0].content, "hello");
    assert_eq!(stored.context.chat_history[1].role, TurnRole::Assistant);
    assert_eq!(stored.context.chat_history[1].content, "hi there");
    assert!(stored.updated_at >= agent.updated_at);
}

#[tokio::test]
async fn calculator_round_trip_records_tool_trace() {
    let llm = ScriptedClient::new(vec![
        tool_call(
            "calculator",
            serde_json::json!({"op": "add", "a": 2, "b": 3}),
            Some(usage(20, 8, 0.0)),
        ),
        reply("2 + 3 = 5", Some(usage(30, 6, 0.0))),
    ]);
    let h = harness(llm, EngineConfig::default()).await;

    let agent = h
        .store
        .put(AgentRecord::new("atlas", "math helper", "You do math.").with_tools(["calculator"]))
        .await
        .unwrap();

    let outcome = h
        .engine
        .process_chat_message(agent.id, "what is 2 + 3?", None)
        .await
        .unwrap();

    assert_eq!(outcome.response, "2 + 3 = 5");
    assert_eq!(outcome.tool_calls.len(), 1);
    assert_eq!(outcome.tool_calls[0].tool, "calculator");
    assert_eq!(outcome.tool_calls[0].output, "5");

    let logs = h.engine.chat_logs(&LogFilter::for_agent(agent.id)).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].has_tool_calls);
    assert_eq!(logs[0].tool_calls.len(), 1);
    assert_eq!(logs[0].tool_calls[0].output, "5");

    // User, assistant (tool request), tool result, final assistant.
    let stored = h.store.get(agent.id).await.unwrap().unwrap();
    assert_eq!(stored.context.chat_history.len(), 4);
    assert_eq!(stored.context.chat_history[2].role, TurnRole::Tool);
    assert_eq!(stored.context.chat_history[2].content, "5");
}

#[tokio::test]
async fn llm_failure_still_writes_exactly_one_log_entry() {
    let llm = ScriptedClient::new(vec![fail("connection refused")]);
    let h = harness(llm, EngineConfig::default()).await;

    let agent = h
        .store
        .put(AgentRecord::new("atlas", "d", "p"))
        .await
        .unwrap();

    let err = h
        .engine
        .process_chat_message(agent.id, "hello", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ColloquyError::Upstream(_)));

    let logs = h.engine.chat_logs(&LogFilter::for_agent(agent.id)).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, LogStatus::Error);
    assert!(logs[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("connection refused"));

    // An unrecoverable execution error marks the agent FAILED.
    assert_eq!(
        h.engine.lifecycle().get_status(agent.id).await.unwrap(),
        AgentStatus::Failed
    );

    // The failed session must not corrupt the persisted history.
    let stored = h.store.get(agent.id).await.unwrap().unwrap();
    assert!(stored.context.chat_history.is_empty());
}

#[tokio::test]
async fn missing_agent_fails_with_not_found_and_is_logged() {
    let llm = ScriptedClient::new(vec![reply("unused", None)]);
    let h = harness(llm, EngineConfig::default()).await;

    let ghost = Uuid::new_v4();
    let err = h
        .engine
        .process_chat_message(ghost, "anyone there?", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ColloquyError::NotFound(_)));

    let logs = h.engine.chat_logs(&LogFilter::for_agent(ghost)).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, LogStatus::Error);
}

#[tokio::test]
async fn tool_loop_is_bounded_and_reports_incomplete() {
    // The script's last step repeats forever: an endless tool-call request.
    let llm = ScriptedClient::new(vec![tool_call(
        "calculator",
        serde_json::json!({"op": "mul", "a": 2, "b": 2}),
        Some(usage(5, 5, 0.0)),
    )]);
    let h = harness(llm.clone(), EngineConfig::default()).await;

    let agent = h
        .store
        .put(AgentRecord::new("looper", "d", "p").with_tools(["calculator"]))
        .await
        .unwrap();

    let outcome = h
        .engine
        .process_chat_message(agent.id, "multiply forever", None)
        .await
        .unwrap();

    assert!(!outcome.completed);
    assert_eq!(outcome.response, INCOMPLETE_NOTICE);
    assert_eq!(outcome.tool_calls.len(), 5);
    assert_eq!(llm.calls(), 5);

    // Incomplete is recoverable: the log entry is a success with the trace.
    let logs = h.engine.chat_logs(&LogFilter::for_agent(agent.id)).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, LogStatus::Success);
    assert_eq!(logs[0].tool_calls.len(), 5);
    // Five round-trips at 10 tokens each.
    assert_eq!(logs[0].total_tokens, 50);
}

#[tokio::test]
async fn usage_sums_across_round_trips_with_gaps() {
    let llm = ScriptedClient::new(vec![
        tool_call(
            "echo",
            serde_json::json!({"text": "one"}),
            Some(usage(10, 5, 0.001)),
        ),
        // This round-trip reports no usage at all.
        tool_call("echo", serde_json::json!({"text": "two"}), None),
        reply("done", Some(usage(7, 3, 0.0005))),
    ]);
    let h = harness(llm, EngineConfig::default()).await;

    let agent = h
        .store
        .put(AgentRecord::new("atlas", "d", "p").with_tools(["echo"]))
        .await
        .unwrap();

    let outcome = h
        .engine
        .process_chat_message(agent.id, "echo twice", None)
        .await
        .unwrap();

    assert_eq!(outcome.usage.input_tokens, 17);
    assert_eq!(outcome.usage.output_tokens, 8);
    assert_eq!(outcome.usage.total_tokens, 25);
    assert!((outcome.usage.cost - 0.0015).abs() < 1e-12);
}

#[tokio::test]
async fn tool_failure_is_absorbed_and_session_completes() {
    let llm = ScriptedClient::new(vec![
        tool_call(
            "calculator",
            serde_json::json!({"op": "div", "a": 1, "b": 0}),
            None,
        ),
        reply("I cannot divide by zero.", None),
    ]);
    let h = harness(llm, EngineConfig::default()).await;

    let agent = h
        .store
        .put(AgentRecord::new("atlas", "d", "p").with_tools(["calculator"]))
        .await
        .unwrap();

    let outcome = h
        .engine
        .process_chat_message(agent.id, "divide 1 by 0", None)
        .await
        .unwrap();

    assert!(outcome.completed);
    assert_eq!(outcome.response, "I cannot divide by zero.");
    assert_eq!(outcome.tool_calls.len(), 1);
    assert!(outcome.tool_calls[0].output.contains("failed"));
}

#[tokio::test]
async fn second_message_sees_prior_history() {
    let llm = ScriptedClient::new(vec![
        reply("hi there", Some(usage(10, 3, 0.0))),
        reply("still here", Some(usage(15, 4, 0.0))),
    ]);
    let h = harness(llm, EngineConfig::default()).await;

    let agent = h
        .store
        .put(AgentRecord::new("atlas", "d", "p"))
        .await
        .unwrap();

    h.engine
        .process_chat_message(agent.id, "hello", None)
        .await
        .unwrap();
    h.engine
        .process_chat_message(agent.id, "are you there?", None)
        .await
        .unwrap();

    let stored = h.store.get(agent.id).await.unwrap().unwrap();
    let contents: Vec<&str> = stored
        .context
        .chat_history
        .iter()
        .map(|t| t.content.as_str())
        .collect();
    assert_eq!(contents, vec!["hello", "hi there", "are you there?", "still here"]);

    let logs = h.engine.chat_logs(&LogFilter::for_agent(agent.id)).await.unwrap();
    assert_eq!(logs.len(), 2);
    // The second entry saw a non-empty persisted history.
    assert!(logs[1].has_memory);
}

#[tokio::test]
async fn per_agent_usage_rollup_sums_all_sessions() {
    let llm = ScriptedClient::new(vec![
        reply("one", Some(usage(10, 5, 0.001))),
        reply("two", Some(usage(20, 10, 0.002))),
    ]);
    let h = harness(llm, EngineConfig::default()).await;

    let agent = h
        .store
        .put(AgentRecord::new("atlas", "d", "p"))
        .await
        .unwrap();

    h.engine
        .process_chat_message(agent.id, "first", None)
        .await
        .unwrap();
    h.engine
        .process_chat_message(agent.id, "second", None)
        .await
        .unwrap();

    let report = h.engine.agent_usage(agent.id).await.unwrap();
    assert_eq!(report.total_interactions, 2);
    assert_eq!(report.total_input_tokens, 30);
    assert_eq!(report.total_output_tokens, 15);
    assert_eq!(report.total_tokens, 45);
    assert!((report.total_cost - 0.003).abs() < 1e-12);
}

#[tokio::test]
async fn custom_iteration_cap_applies() {
    let llm = ScriptedClient::new(vec![tool_call(
        "echo",
        serde_json::json!({"text": "again"}),
        None,
    )]);
    let config = EngineConfig::default().with_max_iterations(2);
    let h = harness(llm.clone(), config).await;

    let agent = h
        .store
        .put(AgentRecord::new("atlas", "d", "p").with_tools(["echo"]))
        .await
        .unwrap();

    let outcome = h
        .engine
        .process_chat_message(agent.id, "loop", None)
        .await
        .unwrap();
    assert!(!outcome.completed);
    assert_eq!(llm.calls(), 2);
    assert_eq!(outcome.tool_calls.len(), 2);
}

#[tokio::test]
async fn requestor_id_is_recorded_when_supplied() {
    let llm = ScriptedClient::new(vec![reply("ok", None)]);
    let h = harness(llm, EngineConfig::default()).await;

    let agent = h
        .store
        .put(AgentRecord::new("atlas", "d", "p"))
        .await
        .unwrap();

    h.engine
        .process_chat_message(agent.id, "hi", Some("ops-42"))
        .await
        .unwrap();

    let logs = h.engine.chat_logs(&LogFilter::for_agent(agent.id)).await.unwrap();
    assert_eq!(logs[0].requestor_id, "ops-42");
}
