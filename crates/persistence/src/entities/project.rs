//! Project, membership and branding entities.

use sqlx::FromRow;
use uuid::Uuid;

use domain::errors::ExportError;
use domain::models::{BrandingProfile, Project};

/// Database row for a project.
#[derive(Debug, Clone, FromRow)]
pub struct ProjectEntity {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
}

impl From<ProjectEntity> for Project {
    fn from(entity: ProjectEntity) -> Self {
        Self {
            id: entity.id,
            workspace_id: entity.workspace_id,
            name: entity.name,
        }
    }
}

/// Database row for a branding profile.
#[derive(Debug, Clone, FromRow)]
pub struct BrandingProfileEntity {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub primary_color: Option<String>,
}

impl TryFrom<BrandingProfileEntity> for BrandingProfile {
    type Error = ExportError;

    fn try_from(entity: BrandingProfileEntity) -> Result<Self, Self::Error> {
        if entity.name.trim().is_empty() {
            return Err(ExportError::Data(format!(
                "branding profile {} has an empty name",
                entity.id
            )));
        }
        Ok(Self {
            id: entity.id,
            workspace_id: entity.workspace_id,
            name: entity.name,
            logo_url: entity.logo_url.filter(|url| !url.trim().is_empty()),
            primary_color: entity.primary_color.filter(|c| !c.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branding_blank_fields_become_none() {
        let entity = BrandingProfileEntity {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            name: "Studio".to_string(),
            logo_url: Some("  ".to_string()),
            primary_color: Some(String::new()),
        };
        let profile = BrandingProfile::try_from(entity).unwrap();
        assert!(profile.logo_url.is_none());
        assert!(profile.primary_color.is_none());
    }

    #[test]
    fn test_branding_requires_name() {
        let entity = BrandingProfileEntity {
            id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            name: " ".to_string(),
            logo_url: None,
            primary_color: None,
        };
        assert!(matches!(
            BrandingProfile::try_from(entity),
            Err(ExportError::Data(_))
        ));
    }
}
