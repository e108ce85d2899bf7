use sqlx::PgPool;

/// Idempotent DDL, applied in order at startup and by `review_catalog migrate`.
const MIGRATIONS: &[&str] = &[
    r#"
    DO $$ BEGIN
        CREATE TYPE user_role AS ENUM ('user', 'moderator', 'admin');
    EXCEPTION
        WHEN duplicate_object THEN NULL;
    END $$
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username VARCHAR(150) NOT NULL UNIQUE,
        email VARCHAR(254) NOT NULL UNIQUE,
        first_name VARCHAR(150) NOT NULL DEFAULT '',
        last_name VARCHAR(150) NOT NULL DEFAULT '',
        bio TEXT NOT NULL DEFAULT '',
        role user_role NOT NULL DEFAULT 'user',
        last_login TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(256) NOT NULL,
        slug VARCHAR(50) NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS genres (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(256) NOT NULL,
        slug VARCHAR(50) NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS titles (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(256) NOT NULL,
        year INTEGER NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        category_id BIGINT REFERENCES categories(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS title_genres (
        title_id BIGINT NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
        genre_id BIGINT NOT NULL REFERENCES genres(id) ON DELETE CASCADE,
        PRIMARY KEY (title_id, genre_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS reviews (
        id BIGSERIAL PRIMARY KEY,
        title_id BIGINT NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
        author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        text TEXT NOT NULL,
        score SMALLINT NOT NULL CHECK (score BETWEEN 1 AND 10),
        pub_date TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT unique_author_title_review UNIQUE (author_id, title_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id BIGSERIAL PRIMARY KEY,
        review_id BIGINT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
        author_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        text TEXT NOT NULL,
        pub_date TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_titles_year ON titles(year)",
    "CREATE INDEX IF NOT EXISTS idx_reviews_title_pub_date ON reviews(title_id, pub_date DESC)",
    "CREATE INDEX IF NOT EXISTS idx_comments_review_pub_date ON comments(review_id, pub_date DESC)",
];

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    for statement in MIGRATIONS {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database migrations completed ({} statements)", MIGRATIONS.len());
    Ok(())
}
