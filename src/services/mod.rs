//! Business logic services

pub mod catalog;
pub mod circulation;
pub mod email;
pub mod notifications;
pub mod reservations;
pub mod scheduler;
pub mod settings;
pub mod stats;
pub mod students;

use std::sync::Arc;

use regex::RegexBuilder;

use crate::{
    clock::Clock,
    config::AppConfig,
    error::{AppError, AppResult},
    repository::Repository,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub circulation: circulation::CirculationService,
    pub email: email::EmailService,
    pub notifications: notifications::NotificationService,
    pub reservations: reservations::ReservationsService,
    pub settings: settings::SettingsService,
    pub stats: stats::StatsService,
    pub students: students::StudentsService,
    pub repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        mail_transport: Arc<dyn email::MailTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let email = email::EmailService::new(
            email::MailSettings::new(config.email.clone()),
            mail_transport,
        );
        let catalog = catalog::CatalogService::new(repository.clone(), clock.clone());
        let students = students::StudentsService::new(repository.clone(), clock.clone());
        let settings = settings::SettingsService::new(repository.clone(), clock.clone());
        let notifications = notifications::NotificationService::new(
            repository.clone(),
            email.clone(),
            students.clone(),
            catalog.clone(),
            config.circulation.clone(),
            clock.clone(),
        );

        Self {
            circulation: circulation::CirculationService::new(
                repository.clone(),
                config.circulation.clone(),
                catalog.clone(),
                students.clone(),
                settings.clone(),
                notifications.clone(),
                clock.clone(),
            ),
            reservations: reservations::ReservationsService::new(
                repository.clone(),
                students.clone(),
                clock.clone(),
            ),
            stats: stats::StatsService::new(repository.clone(), clock),
            catalog,
            email,
            notifications,
            settings,
            students,
            repository,
        }
    }
}

/// Reject search patterns the store's case-insensitive regex match would choke on
pub(crate) fn validate_pattern(pattern: &str) -> AppResult<()> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(|_| ())
        .map_err(|e| AppError::Validation(format!("Invalid search pattern: {}", e)))
}
