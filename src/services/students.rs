//! Student registry service

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use super::validate_pattern;
use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        student::{CreateStudent, Student, UpdateStudent},
        user::UserClaims,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct StudentsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl StudentsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn list(&self, search: Option<&str>) -> AppResult<Vec<Student>> {
        let search = search.filter(|s| !s.trim().is_empty());
        if let Some(pattern) = search {
            validate_pattern(pattern)?;
        }
        self.repository.students.list(search).await
    }

    pub async fn create(&self, request: CreateStudent) -> AppResult<Student> {
        request.validate()?;
        let student = request.into_student(self.clock.now());
        self.repository.students.insert(&student).await?;
        tracing::info!(roll_no = %student.roll_no, "Student registered");
        Ok(student)
    }

    pub async fn update(&self, roll_no: &str, request: UpdateStudent) -> AppResult<Student> {
        request.validate()?;
        let mut student = self
            .repository
            .students
            .find_by_roll_no(roll_no)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".to_string()))?;

        request.apply_to(&mut student, self.clock.now());
        if !self.repository.students.save(&student).await? {
            return Err(AppError::NotFound("Student not found".to_string()));
        }
        Ok(student)
    }

    pub async fn delete(&self, roll_no: &str) -> AppResult<()> {
        if !self.repository.students.delete_by_roll_no(roll_no).await? {
            return Err(AppError::NotFound("Student not found".to_string()));
        }
        tracing::info!(roll_no = %roll_no, "Student removed");
        Ok(())
    }

    /// Resolve a stored student reference: a student id first, then a roll number
    pub async fn resolve(&self, reference: &str) -> AppResult<Option<Student>> {
        if let Ok(id) = Uuid::parse_str(reference) {
            if let Some(student) = self.repository.students.get_by_id(id).await? {
                return Ok(Some(student));
            }
        }
        self.repository.students.find_by_roll_no(reference).await
    }

    /// Student profile of the authenticated caller, matched on email
    pub async fn for_caller(&self, claims: &UserClaims) -> AppResult<Option<Student>> {
        self.repository.students.find_by_email(&claims.email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn service() -> StudentsService {
        StudentsService::new(Repository::in_memory(), Arc::new(SystemClock))
    }

    fn request(roll_no: &str) -> CreateStudent {
        CreateStudent {
            name: "Asha Rao".to_string(),
            roll_no: roll_no.to_string(),
            email: Some("Asha@College.edu".to_string()),
            year_of_study: Some(4),
            department: Some("CSE".to_string()),
        }
    }

    #[tokio::test]
    async fn test_roll_numbers_are_unique() {
        let service = service();
        let student = service.create(request("CS-042")).await.unwrap();
        assert_eq!(student.email.as_deref(), Some("asha@college.edu"));

        assert!(matches!(
            service.create(request("CS-042")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_year_is_rejected() {
        let mut bad = request("CS-043");
        bad.year_of_study = Some(9);
        assert!(matches!(
            service().create(bad).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_by_id_then_roll_number() {
        let service = service();
        let student = service.create(request("CS-042")).await.unwrap();

        let by_id = service.resolve(&student.id.to_string()).await.unwrap();
        let by_roll = service.resolve("CS-042").await.unwrap();
        assert_eq!(by_id.map(|s| s.id), Some(student.id));
        assert_eq!(by_roll.map(|s| s.id), Some(student.id));
        assert!(service.resolve("CS-999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete_by_roll_number() {
        let service = service();
        service.create(request("CS-042")).await.unwrap();

        let updated = service
            .update(
                "CS-042",
                UpdateStudent {
                    year_of_study: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.year_of_study, Some(3));

        service.delete("CS-042").await.unwrap();
        assert!(matches!(
            service.delete("CS-042").await,
            Err(AppError::NotFound(_))
        ));
    }
}
