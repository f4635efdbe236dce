//! Diesel schema (generated by hand, replaceable with `diesel print-schema`).
//!
//! Tables mirror §4.6: specs/applications, the resource lifecycle and its
//! audit trail, workflow/step execution, the graph projection, and the
//! thin session/api-key/queue tables the (out-of-scope) HTTP layer owns.

diesel::table! {
    specs (id) {
        id -> Uuid,
        name -> Text,
        version -> Integer,
        raw_document -> Text,
        parsed -> Jsonb,
        owner -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    applications (id) {
        id -> Uuid,
        spec_id -> Uuid,
        name -> Text,
        owner -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    resource_instances (id) {
        id -> Uuid,
        application_id -> Uuid,
        name -> Text,
        resource_type -> Text,
        state -> Text,
        health_status -> Text,
        kind -> Text,
        configuration -> Jsonb,
        configuration_hash -> Text,
        provider_metadata -> Jsonb,
        error_message -> Nullable<Text>,
        hints -> Jsonb,
        external_state -> Nullable<Jsonb>,
        provider_id -> Nullable<Uuid>,
        reference_url -> Nullable<Text>,
        workflow_execution_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    resource_state_transitions (id) {
        id -> Uuid,
        resource_id -> Uuid,
        from_state -> Nullable<Text>,
        to_state -> Text,
        reason -> Text,
        triggered_by -> Text,
        metadata -> Jsonb,
        occurred_at -> Timestamptz,
    }
}

diesel::table! {
    resource_health_checks (id) {
        id -> Uuid,
        resource_id -> Uuid,
        status -> Text,
        message -> Nullable<Text>,
        checked_at -> Timestamptz,
    }
}

diesel::table! {
    workflow_executions (id) {
        id -> Uuid,
        workflow_name -> Text,
        application_name -> Text,
        parent_resource_id -> Nullable<Uuid>,
        status -> Text,
        inputs -> Jsonb,
        outputs -> Jsonb,
        total_steps -> Integer,
        error_message -> Nullable<Text>,
        started_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    step_executions (id) {
        id -> Uuid,
        workflow_execution_id -> Uuid,
        ordinal -> Integer,
        name -> Text,
        step_type -> Text,
        status -> Text,
        config -> Jsonb,
        attempts -> Integer,
        max_attempts -> Integer,
        timeout_seconds -> BigInt,
        output -> Nullable<Jsonb>,
        error_message -> Nullable<Text>,
        logs -> Jsonb,
        started_at -> Nullable<Timestamptz>,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    graph_nodes (id) {
        id -> Uuid,
        node_type -> Text,
        ref_id -> Uuid,
        label -> Text,
    }
}

diesel::table! {
    graph_edges (id) {
        id -> Uuid,
        from_node -> Uuid,
        to_node -> Uuid,
        edge_type -> Text,
    }
}

diesel::table! {
    graph_annotations (id) {
        id -> Uuid,
        node_id -> Uuid,
        text -> Text,
        created_by -> Text,
        created_at -> Timestamptz,
    }
}

// Owned by the (out-of-scope) HTTP/auth surface; defined here so the
// embedded migration set matches §4.6 in full.
diesel::table! {
    sessions (id) {
        id -> Uuid,
        subject -> Text,
        created_at -> Timestamptz,
        expires_at -> Timestamptz,
    }
}

diesel::table! {
    api_keys (id) {
        id -> Uuid,
        label -> Text,
        key_hash -> Text,
        created_at -> Timestamptz,
        revoked_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    queue_tasks (id) {
        id -> Uuid,
        task_type -> Text,
        payload -> Jsonb,
        run_after -> Timestamptz,
        locked_by -> Nullable<Text>,
        locked_at -> Nullable<Timestamptz>,
        attempts -> Integer,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(specs,
                                               applications,
                                               resource_instances,
                                               resource_state_transitions,
                                               resource_health_checks,
                                               workflow_executions,
                                               step_executions,
                                               graph_nodes,
                                               graph_edges,
                                               graph_annotations,
                                               sessions,
                                               api_keys,
                                               queue_tasks,);
