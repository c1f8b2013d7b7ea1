//! Schema migrations
//!
//! Every statement is idempotent so `run` is safe on each startup.

use sqlx::PgPool;

/// Ordered schema statements
const STATEMENTS: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            identifier TEXT NOT NULL UNIQUE,
            username TEXT NOT NULL DEFAULT '',
            email TEXT,
            provider TEXT NOT NULL,
            password_digest TEXT,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "user_tokens",
        r#"
        CREATE TABLE IF NOT EXISTS user_tokens (
            token_digest TEXT PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK (kind IN ('access', 'refresh')),
            expires_at TIMESTAMPTZ NOT NULL,
            revoked_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "user_tokens_user_idx",
        "CREATE INDEX IF NOT EXISTS user_tokens_user_idx ON user_tokens (user_id)",
    ),
    (
        "projects",
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name VARCHAR(100) NOT NULL,
            color VARCHAR(7) NOT NULL DEFAULT '#3B82F6',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "projects_user_idx",
        "CREATE INDEX IF NOT EXISTS projects_user_idx ON projects (user_id, updated_at DESC)",
    ),
    (
        "materials",
        r#"
        CREATE TABLE IF NOT EXISTS materials (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            title VARCHAR(200) NOT NULL,
            material_type TEXT NOT NULL DEFAULT 'file' CHECK (material_type IN ('file', 'url')),
            url VARCHAR(500),
            page_count INTEGER NOT NULL DEFAULT 0,
            thumbnail_url VARCHAR(500),
            metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "materials_project_idx",
        "CREATE INDEX IF NOT EXISTS materials_project_idx ON materials (project_id, created_at DESC)",
    ),
    (
        "quizzes",
        r#"
        CREATE TABLE IF NOT EXISTS quizzes (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            question_type TEXT NOT NULL DEFAULT 'multiple_choice'
                CHECK (question_type IN ('multiple_choice', 'short_answer', 'mixed')),
            question_count INTEGER NOT NULL DEFAULT 10
                CHECK (question_count BETWEEN 1 AND 50),
            difficulty TEXT NOT NULL DEFAULT 'medium'
                CHECK (difficulty IN ('easy', 'medium', 'hard')),
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'completed', 'failed')),
            error_message TEXT,
            progress_percentage INTEGER NOT NULL DEFAULT 0
                CHECK (progress_percentage BETWEEN 0 AND 100),
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            started_at TIMESTAMPTZ,
            completed_at TIMESTAMPTZ
        )
        "#,
    ),
    (
        "quizzes_project_idx",
        "CREATE INDEX IF NOT EXISTS quizzes_project_idx ON quizzes (project_id, created_at DESC)",
    ),
    (
        "quiz_materials",
        r#"
        CREATE TABLE IF NOT EXISTS quiz_materials (
            quiz_id UUID NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
            material_id UUID NOT NULL REFERENCES materials(id) ON DELETE CASCADE,
            PRIMARY KEY (quiz_id, material_id)
        )
        "#,
    ),
    (
        "quiz_questions",
        r#"
        CREATE TABLE IF NOT EXISTS quiz_questions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            quiz_id UUID NOT NULL REFERENCES quizzes(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            question TEXT NOT NULL,
            answers JSONB NOT NULL DEFAULT '{}'::jsonb,
            metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (quiz_id, position)
        )
        "#,
    ),
    (
        "quiz_answer_histories",
        r#"
        CREATE TABLE IF NOT EXISTS quiz_answer_histories (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            question_id UUID NOT NULL REFERENCES quiz_questions(id) ON DELETE CASCADE,
            answer TEXT NOT NULL,
            is_correct BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, question_id)
        )
        "#,
    ),
];

/// Run all migrations in order.
pub async fn run(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!(statements = STATEMENTS.len(), "running schema migrations");

    for (name, sql) in STATEMENTS {
        tracing::debug!(migration = name, "applying");
        sqlx::query(sql).execute(pool).await?;
    }

    tracing::info!("schema migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_precede_dependents() {
        let position = |name: &str| {
            STATEMENTS
                .iter()
                .position(|(n, _)| *n == name)
                .unwrap_or_else(|| panic!("missing migration {}", name))
        };

        assert!(position("users") < position("projects"));
        assert!(position("projects") < position("materials"));
        assert!(position("materials") < position("quiz_materials"));
        assert!(position("quizzes") < position("quiz_questions"));
        assert!(position("quiz_questions") < position("quiz_answer_histories"));
    }

    #[test]
    fn statements_are_idempotent() {
        for (name, sql) in STATEMENTS {
            assert!(sql.contains("IF NOT EXISTS"), "{} is not idempotent", name);
        }
    }
}
