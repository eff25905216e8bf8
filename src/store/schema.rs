use rusqlite::Connection;

pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )
}

pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS questions (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            question_text     TEXT NOT NULL,
            status            TEXT NOT NULL CHECK(status IN ('DEDUPE_PENDING', 'DEDUPE_APPROVED', 'DUPLICATE_FLAGGED', 'APPROVED')) DEFAULT 'DEDUPE_PENDING',
            subject           TEXT,
            topic             TEXT,
            bloom_level       TEXT,
            parent_id         INTEGER REFERENCES questions(id) ON DELETE SET NULL,
            parallel_group_id INTEGER,
            created_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_questions_status ON questions(status);
        CREATE INDEX IF NOT EXISTS idx_questions_parent ON questions(parent_id);
        CREATE INDEX IF NOT EXISTS idx_questions_group ON questions(parallel_group_id);

        CREATE TABLE IF NOT EXISTS duplicate_matches (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            question_id       INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            match_question_id INTEGER NOT NULL REFERENCES questions(id) ON DELETE CASCADE,
            similarity_score  REAL NOT NULL,
            verdict           TEXT NOT NULL CHECK(verdict IN ('DUPLICATE', 'CONFLICT', 'PARENT_OF', 'CHILD_OF', 'PARALLEL_TO')),
            reason            TEXT NOT NULL DEFAULT '',
            created_at        TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_matches_question ON duplicate_matches(question_id);
        ",
    )
}
