//! HTTP handlers for `/books` and `/books/{isbn}`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use bookstore_http::{error::AppError, extract::ApiJson};

use super::models::{Book, BookChanges, BookListResponse, BookResponse, MessageResponse};
use super::repository::BookRepository;

/// Routes relative to the module mount point.
pub fn router(repository: BookRepository) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{isbn}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(repository)
}

fn missing(isbn: &str) -> AppError {
    AppError::not_found(format!("There is no book with an isbn '{}'", isbn))
}

async fn list_books(
    State(repository): State<BookRepository>,
) -> Result<Json<BookListResponse>, AppError> {
    let books = repository.list().await?;
    tracing::debug!(count = books.len(), "listed books");
    Ok(Json(BookListResponse { books }))
}

async fn get_book(
    State(repository): State<BookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<BookResponse>, AppError> {
    let book = repository.get(&isbn).await?.ok_or_else(|| missing(&isbn))?;
    Ok(Json(BookResponse { book }))
}

async fn create_book(
    State(repository): State<BookRepository>,
    ApiJson(book): ApiJson<Book>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let book = repository.create(&book).await?;
    tracing::info!(isbn = %book.isbn, "book created");
    Ok((StatusCode::CREATED, Json(BookResponse { book })))
}

async fn update_book(
    State(repository): State<BookRepository>,
    Path(isbn): Path<String>,
    ApiJson(changes): ApiJson<BookChanges>,
) -> Result<Json<BookResponse>, AppError> {
    let book = repository
        .update(&isbn, &changes)
        .await?
        .ok_or_else(|| missing(&isbn))?;
    tracing::info!(isbn = %book.isbn, "book updated");
    Ok(Json(BookResponse { book }))
}

async fn delete_book(
    State(repository): State<BookRepository>,
    Path(isbn): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    if !repository.delete(&isbn).await? {
        return Err(missing(&isbn));
    }
    tracing::info!(isbn = %isbn, "book deleted");
    Ok(Json(MessageResponse {
        message: "Book deleted".to_string(),
    }))
}
