//! CSV bulk loader for seeding the catalog.
//!
//! Files must be loaded in dependency order (see `EntityKind::ALL`). Every
//! file is parsed completely and all of its references are checked before
//! anything is written, so a file with one dangling id inserts nothing.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use serde::de::DeserializeOwned;

use crate::db::{ImportExt, ImportTable};
use crate::error::CatalogError;
use crate::utils::validators::{check_score, check_username, check_year};

mod rows;
use rows::{CatalogRow, CommentRow, GenreTitleRow, ReviewRow, TitleRow, UserRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Category,
    Genre,
    User,
    Title,
    GenreTitle,
    Review,
    Comment,
}

impl EntityKind {
    /// Every kind, in the order the files have to be imported
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Category,
        EntityKind::Genre,
        EntityKind::User,
        EntityKind::Title,
        EntityKind::GenreTitle,
        EntityKind::Review,
        EntityKind::Comment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Category => "category",
            EntityKind::Genre => "genre",
            EntityKind::User => "user",
            EntityKind::Title => "title",
            EntityKind::GenreTitle => "genre_title",
            EntityKind::Review => "review",
            EntityKind::Comment => "comment",
        }
    }

    /// File name used by `import-all`
    pub fn file_name(self) -> &'static str {
        match self {
            EntityKind::Category => "category.csv",
            EntityKind::Genre => "genre.csv",
            EntityKind::User => "users.csv",
            EntityKind::Title => "titles.csv",
            EntityKind::GenreTitle => "genre_title.csv",
            EntityKind::Review => "review.csv",
            EntityKind::Comment => "comments.csv",
        }
    }

    fn known_kinds() -> String {
        EntityKind::ALL
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| ImportError::UnknownKind {
                kind: s.to_string(),
                known: EntityKind::known_kinds(),
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Entity kind '{kind}' does not exist. Known kinds: {known}")]
    UnknownKind { kind: String, known: String },

    #[error("{}: {}", .path.display(), .source)]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Outcome of importing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub kind: EntityKind,
    pub rows: usize,
    pub inserted: u64,
}

impl ImportSummary {
    /// Rows that already existed (same id or unique key)
    pub fn skipped(&self) -> u64 {
        (self.rows as u64).saturating_sub(self.inserted)
    }
}

/// A parsed record with its 1-based line in the file (the header is line 1)
type Lined<T> = (usize, T);

fn parse_rows<T: DeserializeOwned, R: Read>(reader: R) -> Result<Vec<Lined<T>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize().enumerate() {
        rows.push((index + 2, record?));
    }
    Ok(rows)
}

/// Fails with `NotFound` naming the first line whose id has no row in `table`.
async fn require_ids<S: ImportExt>(
    store: &S,
    kind: EntityKind,
    table: ImportTable,
    refs: &[Lined<i64>],
) -> Result<(), CatalogError> {
    if refs.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = refs.iter().map(|(_, id)| *id).collect();
    let missing = store.missing_ids(table, &ids).await?;

    match missing.first() {
        None => Ok(()),
        Some(&id) => {
            let line = refs
                .iter()
                .find(|(_, r)| *r == id)
                .map_or(0, |(line, _)| *line);
            Err(CatalogError::not_found(format!(
                "{} line {}: {} with id={} does not exist",
                kind,
                line,
                table.label(),
                id
            )))
        }
    }
}

/// Applies a field rule to every row, prefixing failures with the CSV line.
fn check_rows<T>(
    kind: EntityKind,
    rows: &[Lined<T>],
    check: impl Fn(&T) -> Result<(), CatalogError>,
) -> Result<(), CatalogError> {
    for (line, row) in rows {
        check(row).map_err(|e| CatalogError::validation(format!("{kind} line {line}: {e}")))?;
    }
    Ok(())
}

fn references<T>(rows: &[Lined<T>], id: impl Fn(&T) -> Option<i64>) -> Vec<Lined<i64>> {
    rows.iter()
        .filter_map(|(line, row)| id(row).map(|id| (*line, id)))
        .collect()
}

/// Import the records of one kind from `reader`. Returns the number of rows
/// read and the number actually inserted.
pub async fn import_records<S: ImportExt, R: Read>(
    store: &S,
    kind: EntityKind,
    reader: R,
    source: &Path,
) -> Result<ImportSummary, ImportError> {
    let csv_error = |source_err: csv::Error| ImportError::Csv {
        path: source.to_path_buf(),
        source: source_err,
    };
    let now = Utc::now();

    let (rows, inserted) = match kind {
        EntityKind::Category => {
            let rows: Vec<Lined<CatalogRow>> = parse_rows(reader).map_err(csv_error)?;
            let categories: Vec<_> = rows.into_iter().map(|(_, r)| r.into_category()).collect();
            (categories.len(), store.import_catalog_entries(&categories).await?)
        }
        EntityKind::Genre => {
            let rows: Vec<Lined<CatalogRow>> = parse_rows(reader).map_err(csv_error)?;
            let genres: Vec<_> = rows.into_iter().map(|(_, r)| r.into_genre()).collect();
            (genres.len(), store.import_catalog_entries(&genres).await?)
        }
        EntityKind::User => {
            let rows: Vec<Lined<UserRow>> = parse_rows(reader).map_err(csv_error)?;
            check_rows(kind, &rows, |r| check_username(&r.username))?;
            let users: Vec<_> = rows.into_iter().map(|(_, r)| r.into_user(now)).collect();
            (users.len(), store.import_users(&users).await?)
        }
        EntityKind::Title => {
            let rows: Vec<Lined<TitleRow>> = parse_rows(reader).map_err(csv_error)?;
            check_rows(kind, &rows, |r| check_year(r.year))?;
            require_ids(
                store,
                kind,
                ImportTable::Categories,
                &references(&rows, |r| r.category),
            )
            .await?;
            let titles: Vec<_> = rows.into_iter().map(|(_, r)| r.into_title()).collect();
            (titles.len(), store.import_titles(&titles).await?)
        }
        EntityKind::GenreTitle => {
            let rows: Vec<Lined<GenreTitleRow>> = parse_rows(reader).map_err(csv_error)?;
            require_ids(
                store,
                kind,
                ImportTable::Titles,
                &references(&rows, |r| Some(r.title_id)),
            )
            .await?;
            require_ids(
                store,
                kind,
                ImportTable::Genres,
                &references(&rows, |r| Some(r.genre_id)),
            )
            .await?;
            let links: Vec<(i64, i64)> = rows
                .iter()
                .map(|(_, r)| (r.title_id, r.genre_id))
                .collect();
            (links.len(), store.import_genre_links(&links).await?)
        }
        EntityKind::Review => {
            let rows: Vec<Lined<ReviewRow>> = parse_rows(reader).map_err(csv_error)?;
            check_rows(kind, &rows, |r| check_score(r.score))?;
            require_ids(
                store,
                kind,
                ImportTable::Titles,
                &references(&rows, |r| Some(r.title_id)),
            )
            .await?;
            require_ids(
                store,
                kind,
                ImportTable::Users,
                &references(&rows, |r| Some(r.author)),
            )
            .await?;
            let reviews: Vec<_> = rows.into_iter().map(|(_, r)| r.into_review(now)).collect();
            (reviews.len(), store.import_reviews(&reviews).await?)
        }
        EntityKind::Comment => {
            let rows: Vec<Lined<CommentRow>> = parse_rows(reader).map_err(csv_error)?;
            require_ids(
                store,
                kind,
                ImportTable::Reviews,
                &references(&rows, |r| Some(r.review_id)),
            )
            .await?;
            require_ids(
                store,
                kind,
                ImportTable::Users,
                &references(&rows, |r| Some(r.author)),
            )
            .await?;
            let comments: Vec<_> = rows.into_iter().map(|(_, r)| r.into_comment(now)).collect();
            (comments.len(), store.import_comments(&comments).await?)
        }
    };

    let summary = ImportSummary {
        kind,
        rows,
        inserted,
    };
    tracing::info!(
        kind = %kind,
        file = %source.display(),
        rows = summary.rows,
        inserted = summary.inserted,
        skipped = summary.skipped(),
        "import finished"
    );
    Ok(summary)
}

pub async fn import_file<S: ImportExt>(
    store: &S,
    kind: EntityKind,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::Csv {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })?;
    import_records(store, kind, file, path).await
}

/// Import the standard file set from `dir` in dependency order, stopping at
/// the first failing file.
pub async fn import_all<S: ImportExt>(
    store: &S,
    dir: &Path,
) -> Result<Vec<ImportSummary>, ImportError> {
    let mut summaries = Vec::with_capacity(EntityKind::ALL.len());
    for kind in EntityKind::ALL {
        summaries.push(import_file(store, kind, &dir.join(kind.file_name())).await?);
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::{ReviewExt, TitleExt, TitleFilter, UserExt};
    use crate::models::UserRole;

    async fn load(
        store: &MemoryStore,
        kind: EntityKind,
        csv: &str,
    ) -> Result<ImportSummary, ImportError> {
        import_records(store, kind, csv.as_bytes(), Path::new(kind.file_name())).await
    }

    const CATEGORIES: &str = "id,name,slug\n1,Фильм,movie\n2,Книга,book\n";
    const GENRES: &str = "id,name,slug\n1,Драма,drama\n2,Комедия,comedy\n";
    const USERS: &str = "id,username,email,role,bio,first_name,last_name\n\
                         100,bingobongo,bingobongo@yamdb.fake,user,,,\n\
                         101,capt_obvious,capt_obvious@yamdb.fake,admin,,Captain,Obvious\n\
                         102,faust,faust@yamdb.fake,moderator,Ich bin,,\n";
    const TITLES: &str = "id,name,year,category\n1,Побег из Шоушенка,1994,1\n2,Крестный отец,1972,1\n";

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        load(&store, EntityKind::Category, CATEGORIES).await.unwrap();
        load(&store, EntityKind::Genre, GENRES).await.unwrap();
        load(&store, EntityKind::User, USERS).await.unwrap();
        load(&store, EntityKind::Title, TITLES).await.unwrap();
        store
    }

    #[test]
    fn kinds_parse_case_insensitively() {
        assert_eq!("Genre_Title".parse::<EntityKind>().unwrap(), EntityKind::GenreTitle);
        assert_eq!("REVIEW".parse::<EntityKind>().unwrap(), EntityKind::Review);
    }

    #[test]
    fn unknown_kind_lists_known_kinds() {
        let err = "rating".parse::<EntityKind>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'rating'"));
        assert!(message.contains("category, genre, user, title, genre_title, review, comment"));
    }

    #[tokio::test]
    async fn users_keep_their_ids_and_roles() {
        let store = seeded().await;
        let admin = store.get_user(Some(101), None, None).await.unwrap().unwrap();
        assert_eq!(admin.username, "capt_obvious");
        assert_eq!(admin.role, UserRole::Admin);
        assert_eq!(admin.first_name, "Captain");
        let user = store.get_user(None, Some("bingobongo"), None).await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.bio, "");
    }

    #[tokio::test]
    async fn title_with_missing_category_aborts_whole_file() {
        let store = MemoryStore::new();
        load(&store, EntityKind::Category, CATEGORIES).await.unwrap();

        let csv = "id,name,year,category\n1,Ok,1990,1\n2,Broken,1991,99\n";
        let err = load(&store, EntityKind::Title, csv).await.unwrap_err();

        match err {
            ImportError::Catalog(CatalogError::NotFound(message)) => {
                assert!(message.contains("line 3"), "{message}");
                assert!(message.contains("id=99"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
        let count = store.get_title_count(&TitleFilter::default()).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn genre_links_before_titles_are_rejected() {
        let store = MemoryStore::new();
        load(&store, EntityKind::Genre, GENRES).await.unwrap();

        let err = load(&store, EntityKind::GenreTitle, "id,title_id,genre_id\n1,1,1\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Catalog(CatalogError::NotFound(_))));
        assert!(store.genre_links().is_empty());
    }

    #[tokio::test]
    async fn genre_links_attach_to_titles() {
        let store = seeded().await;
        let summary = load(
            &store,
            EntityKind::GenreTitle,
            "id,title_id,genre_id\n1,1,1\n2,1,2\n3,2,1\n",
        )
        .await
        .unwrap();
        assert_eq!(summary.inserted, 3);

        let title = store.get_title(1).await.unwrap().unwrap();
        let slugs: Vec<&str> = title.genre.iter().map(|g| g.slug.as_str()).collect();
        assert_eq!(slugs.len(), 2);
        assert!(slugs.contains(&"drama") && slugs.contains(&"comedy"));
        assert_eq!(title.category.unwrap().slug, "movie");
    }

    #[tokio::test]
    async fn reimport_is_idempotent() {
        let store = seeded().await;

        let again = load(&store, EntityKind::Category, CATEGORIES).await.unwrap();
        assert_eq!(again.rows, 2);
        assert_eq!(again.inserted, 0);
        assert_eq!(again.skipped(), 2);

        let users = load(&store, EntityKind::User, USERS).await.unwrap();
        assert_eq!(users.inserted, 0);
        assert_eq!(store.get_user_count(None).await.unwrap(), 3);
        assert_eq!(store.catalog_count("categories"), 2);
    }

    #[tokio::test]
    async fn reviews_and_comments_resolve_authors_by_id() {
        let store = seeded().await;
        load(
            &store,
            EntityKind::Review,
            "id,title_id,text,author,score,pub_date\n\
             1,1,Great,100,10,2019-09-24T21:08:21.567Z\n\
             2,1,Good,102,8,2019-09-24T21:08:21.567Z\n",
        )
        .await
        .unwrap();
        load(
            &store,
            EntityKind::Comment,
            "id,review_id,text,author,pub_date\n1,1,Agreed,101,2019-09-24T21:08:21.567Z\n",
        )
        .await
        .unwrap();

        let reviews = store.get_reviews(1, 1, 10).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert!(reviews.iter().any(|r| r.author == "faust" && r.score == 8));
        assert_eq!(store.comment_count(), 1);
        assert_eq!(store.get_title(1).await.unwrap().unwrap().rating, Some(9.0));
    }

    #[tokio::test]
    async fn review_with_unknown_author_inserts_nothing() {
        let store = seeded().await;
        let err = load(
            &store,
            EntityKind::Review,
            "id,title_id,text,author,score,pub_date\n1,1,Fine,100,7,\n2,1,Ghost,555,7,\n",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ImportError::Catalog(CatalogError::NotFound(_))));
        assert_eq!(store.review_count(), 0);
    }

    #[tokio::test]
    async fn review_score_out_of_range_is_a_validation_error() {
        let store = seeded().await;
        let err = load(
            &store,
            EntityKind::Review,
            "id,title_id,text,author,score,pub_date\n1,1,Too much,100,11,\n",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ImportError::Catalog(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn reserved_or_malformed_usernames_are_rejected_with_line() {
        for name in ["me", "bad name"] {
            let store = MemoryStore::new();
            let csv = format!(
                "id,username,email,role,bio,first_name,last_name\n\
                 1,fine,fine@yamdb.fake,user,,,\n\
                 2,{name},other@yamdb.fake,user,,,\n"
            );
            let err = load(&store, EntityKind::User, &csv).await.unwrap_err();
            match err {
                ImportError::Catalog(CatalogError::Validation(message)) => {
                    assert!(message.starts_with("user line 3:"), "{message}");
                }
                other => panic!("unexpected error for {name}: {other}"),
            }
            assert_eq!(store.get_user_count(None).await.unwrap(), 0);
        }
    }

    #[tokio::test]
    async fn title_from_the_future_is_rejected() {
        let store = MemoryStore::new();
        load(&store, EntityKind::Category, CATEGORIES).await.unwrap();

        let err = load(
            &store,
            EntityKind::Title,
            "id,name,year,category\n1,Tomorrow,9999,1\n",
        )
        .await
        .unwrap_err();
        match err {
            ImportError::Catalog(CatalogError::Validation(message)) => {
                assert!(message.starts_with("title line 2:"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
        let count = store.get_title_count(&TitleFilter::default()).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn listings_order_titles_by_year_and_users_by_id() {
        let store = seeded().await;

        let titles = store.get_titles(&TitleFilter::default(), 1, 10).await.unwrap();
        let years: Vec<i32> = titles.iter().map(|t| t.year).collect();
        assert_eq!(years, vec![1994, 1972]);

        let users = store.get_users(None, 1, 10).await.unwrap();
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![100, 101, 102]);
    }

    #[tokio::test]
    async fn malformed_row_is_a_csv_error() {
        let store = MemoryStore::new();
        let err = load(&store, EntityKind::Title, "id,name,year,category\nx,Bad,year,\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::Csv { .. }));
    }

    #[tokio::test]
    async fn import_all_runs_the_standard_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let files = [
            ("category.csv", CATEGORIES),
            ("genre.csv", GENRES),
            ("users.csv", USERS),
            ("titles.csv", TITLES),
            ("genre_title.csv", "id,title_id,genre_id\n1,1,1\n"),
            ("review.csv", "id,title_id,text,author,score,pub_date\n1,2,Classic,100,9,\n"),
            ("comments.csv", "id,review_id,text,author,pub_date\n1,1,Yes,102,\n"),
        ];
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }

        let store = MemoryStore::new();
        let summaries = import_all(&store, dir.path()).await.unwrap();

        let kinds: Vec<EntityKind> = summaries.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, EntityKind::ALL.to_vec());
        assert_eq!(store.get_title_review_count(2).await.unwrap(), 1);
        assert_eq!(store.comment_count(), 1);
        assert_eq!(store.genre_links(), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn import_all_stops_at_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("category.csv"), CATEGORIES).unwrap();

        let store = MemoryStore::new();
        let err = import_all(&store, dir.path()).await.unwrap_err();
        assert!(matches!(err, ImportError::Csv { .. }));
        assert_eq!(store.catalog_count("categories"), 2);
    }
}
