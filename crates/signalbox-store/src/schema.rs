//! Pipeline database schema. The canonical copies live under `migrations/`;
//! these constants exist for tooling and ad-hoc provisioning.

/// SQL to create the outbox table.
pub const CREATE_OUTBOX_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS outbox_events (
    id              UUID PRIMARY KEY,
    aggregate_type  VARCHAR(255) NOT NULL,
    aggregate_id    VARCHAR(255) NOT NULL,
    event_type      VARCHAR(255) NOT NULL,
    payload         JSONB NOT NULL,
    status          VARCHAR(32) NOT NULL DEFAULT 'pending',
    correlation_id  UUID,
    retry_count     INTEGER NOT NULL DEFAULT 0,
    error_message   TEXT,
    next_attempt_at TIMESTAMPTZ NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    processed_at    TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_outbox_events_due
    ON outbox_events (status, next_attempt_at, created_at);
";

/// SQL to create the dead-letter table.
pub const CREATE_DEAD_LETTER_EVENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS dead_letter_events (
    id              UUID PRIMARY KEY,
    original_topic  VARCHAR(255) NOT NULL,
    payload         JSONB NOT NULL,
    metadata        JSONB NOT NULL DEFAULT '{}',
    status          VARCHAR(32) NOT NULL DEFAULT 'pending',
    retry_count     INTEGER NOT NULL DEFAULT 0,
    last_error      TEXT,
    next_retry_at   TIMESTAMPTZ NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    processed_at    TIMESTAMPTZ
);

CREATE INDEX IF NOT EXISTS idx_dead_letter_events_due
    ON dead_letter_events (status, next_retry_at, created_at);

CREATE INDEX IF NOT EXISTS idx_dead_letter_events_topic
    ON dead_letter_events (original_topic);
";
