//! Catalog service: physical copies and the grouped title view

use std::{collections::BTreeMap, sync::Arc};

use uuid::Uuid;
use validator::Validate;

use super::validate_pattern;
use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        copy::{
            BookCopy, CatalogQuery, CatalogResponse, CopyFilter, CopyStatus, CreateBookCopy,
            GroupedBook,
        },
        loan::BorrowedBook,
    },
    repository::Repository,
};

const DEFAULT_PAGE_SIZE: i64 = 12;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

/// Collapse copies sharing title and author into one catalog entry
fn group_copies(copies: Vec<BookCopy>) -> Vec<GroupedBook> {
    let mut groups: BTreeMap<(String, Option<String>), Vec<BookCopy>> = BTreeMap::new();
    for copy in copies {
        groups
            .entry((copy.title.clone(), copy.author.clone()))
            .or_default()
            .push(copy);
    }

    groups
        .into_iter()
        .filter_map(|((title, author), copies)| {
            let first = copies.first()?.clone();
            let available = copies
                .iter()
                .filter(|c| c.status == CopyStatus::Available)
                .count() as i64;
            Some(GroupedBook {
                title,
                author,
                genre: first.genre,
                category: first.category,
                location: first.location,
                isbn: first.isbn,
                is_core: copies.iter().any(|c| c.is_core),
                total_copies: copies.len() as i64,
                available_copies: available,
                derived_status: if available > 0 {
                    CopyStatus::Available
                } else {
                    CopyStatus::Borrowed
                },
                copy_ids: copies.iter().map(|c| c.id).collect(),
            })
        })
        .collect()
}

/// `None` for an absent or `All` filter value
fn meaningful(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty() && *v != "All")
}

impl CatalogService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Add one physical copy
    pub async fn create_copy(&self, request: CreateBookCopy) -> AppResult<BookCopy> {
        request.validate()?;
        let copy = request.into_copy(self.clock.now());
        self.repository.copies.insert(&copy).await?;
        tracing::info!(copy_id = %copy.id, title = %copy.title, "Copy added to catalog");
        Ok(copy)
    }

    pub async fn get_copy(&self, id: Uuid) -> AppResult<BookCopy> {
        self.repository
            .copies
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book copy not found".to_string()))
    }

    /// Grouped catalog page
    pub async fn list_grouped(&self, query: &CatalogQuery) -> AppResult<CatalogResponse> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.filter(|l| *l > 0).unwrap_or(DEFAULT_PAGE_SIZE);

        let search = meaningful(query.search.as_deref());
        if let Some(pattern) = search {
            validate_pattern(pattern)?;
        }
        let filter = CopyFilter {
            search: search.map(str::to_string),
            genre: meaningful(query.genre.as_deref()).map(str::to_string),
        };

        let mut books = group_copies(self.repository.copies.list(&filter).await?);

        match meaningful(query.status.as_deref()) {
            Some("Available") => books.retain(|b| b.derived_status == CopyStatus::Available),
            Some("Borrowed") => books.retain(|b| b.derived_status == CopyStatus::Borrowed),
            _ => {}
        }
        if query.sort.as_deref() == Some("title_desc") {
            books.reverse();
        }

        let total = books.len() as i64;
        let books = books
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .collect();

        Ok(CatalogResponse {
            books,
            total_pages: (total + limit - 1) / limit,
            current_page: page,
            total_books: total,
        })
    }

    /// Every copy sharing the title and author of `copy_id`
    pub async fn copies_of(&self, copy_id: Uuid) -> AppResult<Vec<BookCopy>> {
        let copy = self.get_copy(copy_id).await?;
        self.repository
            .copies
            .list_group(&copy.title, copy.author.as_deref())
            .await
    }

    pub async fn delete_copy(&self, id: Uuid) -> AppResult<()> {
        if !self.repository.copies.delete(id).await? {
            return Err(AppError::NotFound("Book copy not found".to_string()));
        }
        tracing::info!(copy_id = %id, "Copy removed from catalog");
        Ok(())
    }

    /// Whether a borrow record's resource carries the core fine rate.
    ///
    /// Uses the linked copy, or any copy with the same title when the link
    /// is absent or dangling.
    pub async fn is_core_for(&self, record: &BorrowedBook) -> AppResult<bool> {
        if let Some(book_id) = record.book_id {
            if let Some(copy) = self.repository.copies.get_by_id(book_id).await? {
                return Ok(copy.is_core);
            }
        }
        Ok(self
            .repository
            .copies
            .find_by_title(&record.book_title)
            .await?
            .map(|c| c.is_core)
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use chrono::{Duration, Utc};

    fn service() -> CatalogService {
        CatalogService::new(Repository::in_memory(), Arc::new(SystemClock))
    }

    fn request(title: &str, genre: &str) -> CreateBookCopy {
        CreateBookCopy {
            title: title.to_string(),
            author: Some("Someone".to_string()),
            genre: Some(genre.to_string()),
            publisher: None,
            description: None,
            image_url: None,
            isbn: None,
            location: Some("Shelf A".to_string()),
            category: None,
            is_core: Some(false),
        }
    }

    #[tokio::test]
    async fn test_grouped_view_counts_copies() {
        let service = service();
        let a = service.create_copy(request("Dune", "Fiction")).await.unwrap();
        service.create_copy(request("Dune", "Fiction")).await.unwrap();
        service.create_copy(request("Algorithms", "Science")).await.unwrap();

        let now = Utc::now();
        service
            .repository
            .copies
            .claim(a.id, "asha@college.edu", now + Duration::days(14), now)
            .await
            .unwrap();

        let all = service.list_grouped(&CatalogQuery::default()).await.unwrap();
        assert_eq!(all.total_books, 2);
        assert_eq!(all.books[0].title, "Algorithms");
        let dune = &all.books[1];
        assert_eq!(dune.total_copies, 2);
        assert_eq!(dune.available_copies, 1);
        assert_eq!(dune.derived_status, CopyStatus::Available);

        let fiction = service
            .list_grouped(&CatalogQuery {
                genre: Some("Fiction".to_string()),
                sort: Some("title_desc".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(fiction.total_books, 1);
        assert_eq!(fiction.total_pages, 1);
    }

    #[tokio::test]
    async fn test_status_filter_uses_derived_status() {
        let service = service();
        let only = service.create_copy(request("Emma", "Fiction")).await.unwrap();
        let now = Utc::now();
        service
            .repository
            .copies
            .claim(only.id, "ravi@college.edu", now, now)
            .await
            .unwrap();

        let borrowed = service
            .list_grouped(&CatalogQuery {
                status: Some("Borrowed".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(borrowed.total_books, 1);
        assert_eq!(borrowed.books[0].derived_status, CopyStatus::Borrowed);
    }

    #[tokio::test]
    async fn test_is_core_falls_back_to_title() {
        let service = service();
        let mut core = request("Compilers", "Science");
        core.is_core = Some(true);
        service.create_copy(core).await.unwrap();

        let now = Utc::now();
        let record = BorrowedBook::new(
            "Asha".into(),
            "CS-042".into(),
            Some(Uuid::new_v4()),
            "Compilers".into(),
            now,
            now,
            now,
        );
        assert!(service.is_core_for(&record).await.unwrap());
    }
}
