//! Library-wide settings (exam periods)

use std::sync::Arc;

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::system_config::{ExamPeriod, SystemConfig, UpdateExamPeriods},
    repository::Repository,
};

#[derive(Clone)]
pub struct SettingsService {
    repository: Repository,
    clock: Arc<dyn Clock>,
}

impl SettingsService {
    pub fn new(repository: Repository, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Configured exam periods, empty when nothing was saved yet
    pub async fn exam_periods(&self) -> AppResult<Vec<ExamPeriod>> {
        Ok(self
            .repository
            .system_config
            .get()
            .await?
            .map(|c| c.exam_periods)
            .unwrap_or_default())
    }

    pub async fn update_exam_periods(&self, request: UpdateExamPeriods) -> AppResult<SystemConfig> {
        if let Some(bad) = request.exam_periods.iter().find(|p| p.start_date > p.end_date) {
            return Err(AppError::Validation(format!(
                "Exam period {} ends before it starts",
                bad.name.as_deref().unwrap_or("(unnamed)")
            )));
        }

        let config = SystemConfig {
            exam_periods: request.exam_periods,
            updated_at: Some(self.clock.now()),
            ..SystemConfig::default()
        };
        self.repository.system_config.upsert(&config).await?;
        tracing::info!(periods = config.exam_periods.len(), "Exam periods updated");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_exam_periods_round_through_the_store() {
        let service = SettingsService::new(Repository::in_memory(), Arc::new(SystemClock));
        assert!(service.exam_periods().await.unwrap().is_empty());

        let start = Utc::now();
        let period = ExamPeriod {
            name: Some("Finals".to_string()),
            start_date: start,
            end_date: start + Duration::days(10),
        };
        service
            .update_exam_periods(UpdateExamPeriods {
                exam_periods: vec![period.clone()],
            })
            .await
            .unwrap();
        assert_eq!(service.exam_periods().await.unwrap(), vec![period]);
    }

    #[tokio::test]
    async fn test_inverted_period_is_rejected() {
        let service = SettingsService::new(Repository::in_memory(), Arc::new(SystemClock));
        let start = Utc::now();
        let result = service
            .update_exam_periods(UpdateExamPeriods {
                exam_periods: vec![ExamPeriod {
                    name: None,
                    start_date: start,
                    end_date: start - Duration::days(1),
                }],
            })
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
