//! Parameterized SQL over the `books` table.

use bookstore_db::{Database, DbResult};

use super::models::{Book, BookChanges};

const SELECT_ALL: &str = "
    SELECT isbn, amazon_url, author, language, pages, publisher, title, year
    FROM books";

const COUNT: &str = "SELECT COUNT(*) FROM books";

const SELECT_ONE: &str = "
    SELECT isbn, amazon_url, author, language, pages, publisher, title, year
    FROM books
    WHERE isbn = ?";

const INSERT: &str = "
    INSERT INTO books (isbn, amazon_url, author, language, pages, publisher, title, year)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    RETURNING isbn, amazon_url, author, language, pages, publisher, title, year";

const UPDATE: &str = "
    UPDATE books
    SET amazon_url = ?, author = ?, language = ?, pages = ?, publisher = ?, title = ?, year = ?
    WHERE isbn = ?
    RETURNING isbn, amazon_url, author, language, pages, publisher, title, year";

const DELETE: &str = "DELETE FROM books WHERE isbn = ?";

/// Stateless access to persisted books. Each call runs exactly one statement.
#[derive(Debug, Clone)]
pub struct BookRepository {
    db: Database,
}

impl BookRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// All books in the order the database returns them.
    pub async fn list(&self) -> DbResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(SELECT_ALL)
            .fetch_all(self.db.pool())
            .await?;
        Ok(books)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as(COUNT).fetch_one(self.db.pool()).await?;
        Ok(count)
    }

    pub async fn get(&self, isbn: &str) -> DbResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>(SELECT_ONE)
            .bind(isbn)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(book)
    }

    /// Insert `book` and return the stored row. A duplicate `isbn` surfaces as
    /// [`bookstore_db::DbError::UniqueViolation`].
    pub async fn create(&self, book: &Book) -> DbResult<Book> {
        let created = sqlx::query_as::<_, Book>(INSERT)
            .bind(&book.isbn)
            .bind(&book.amazon_url)
            .bind(&book.author)
            .bind(&book.language)
            .bind(book.pages)
            .bind(&book.publisher)
            .bind(&book.title)
            .bind(book.year)
            .fetch_one(self.db.pool())
            .await?;
        Ok(created)
    }

    /// Replace every non-key column. `None` when no row has this `isbn`.
    pub async fn update(&self, isbn: &str, changes: &BookChanges) -> DbResult<Option<Book>> {
        // RETURNING yields no row when the WHERE clause matched nothing.
        let updated = sqlx::query_as::<_, Book>(UPDATE)
            .bind(&changes.amazon_url)
            .bind(&changes.author)
            .bind(&changes.language)
            .bind(changes.pages)
            .bind(&changes.publisher)
            .bind(&changes.title)
            .bind(changes.year)
            .bind(isbn)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(updated)
    }

    /// Remove the row. Returns `false` when nothing was deleted.
    pub async fn delete(&self, isbn: &str) -> DbResult<bool> {
        let result = sqlx::query(DELETE)
            .bind(isbn)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::SCHEMA;
    use bookstore_db::{DbError, PoolConfig};

    async fn repository() -> BookRepository {
        let db = Database::connect(&PoolConfig::in_memory()).await.unwrap();
        db.apply_schema([("books/001_init", SCHEMA)]).await.unwrap();
        BookRepository::new(db)
    }

    fn book(isbn: &str) -> Book {
        Book {
            isbn: isbn.to_string(),
            amazon_url: "https://amazon.com/books".to_string(),
            author: "Cynthia".to_string(),
            language: "English".to_string(),
            pages: 70,
            publisher: "Publishers".to_string(),
            title: "Great book".to_string(),
            year: 2001,
        }
    }

    #[tokio::test]
    async fn created_book_reads_back_identically() {
        let repo = repository().await;
        let created = repo.create(&book("1233211234567")).await.unwrap();

        assert_eq!(created, book("1233211234567"));
        assert_eq!(repo.get("1233211234567").await.unwrap(), Some(created));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn count_tracks_rows() {
        let repo = repository().await;
        assert_eq!(repo.count().await.unwrap(), 0);

        repo.create(&book("1")).await.unwrap();
        repo.create(&book("2")).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);

        repo.delete("1").await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_isbn_is_rejected() {
        let repo = repository().await;
        repo.create(&book("1")).await.unwrap();

        let err = repo.create(&book("1")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation(_)), "{err:?}");
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_of_missing_row_report_absence() {
        let repo = repository().await;
        let changes = BookChanges {
            amazon_url: "https://new.com".to_string(),
            author: "new author".to_string(),
            language: "new language".to_string(),
            pages: 1000,
            publisher: "new publisher".to_string(),
            title: "update title".to_string(),
            year: 2022,
        };

        assert_eq!(repo.update("0", &changes).await.unwrap(), None);
        assert!(!repo.delete("0").await.unwrap());
    }

    #[tokio::test]
    async fn update_replaces_columns_but_keeps_key() {
        let repo = repository().await;
        repo.create(&book("42")).await.unwrap();

        let changes = BookChanges {
            amazon_url: "https://new.com".to_string(),
            author: "new author".to_string(),
            language: "new language".to_string(),
            pages: 1000,
            publisher: "new publisher".to_string(),
            title: "update title".to_string(),
            year: 2022,
        };
        let updated = repo.update("42", &changes).await.unwrap().unwrap();

        assert_eq!(updated.isbn, "42");
        assert_eq!(updated.title, "update title");
        assert_eq!(updated.pages, 1000);
        assert_eq!(repo.get("42").await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let repo = repository().await;
        repo.create(&book("7")).await.unwrap();

        assert!(repo.delete("7").await.unwrap());
        assert_eq!(repo.get("7").await.unwrap(), None);
        assert!(repo.list().await.unwrap().is_empty());
    }
}
