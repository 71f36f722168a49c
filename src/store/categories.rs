use super::ScheduleStore;
use crate::db::KeyValueStore;
use crate::error::AppError;
use crate::models::Category;
use crate::validation::{validate_category_name, validate_color};
use log::info;
use uuid::Uuid;

impl<S: KeyValueStore> ScheduleStore<S> {
    pub fn category(&self, id: &str) -> Option<&Category> {
        Category::find(&self.categories, id)
    }

    /// Add a category. Names are unique, compared case-insensitively.
    pub fn add_category(&mut self, name: &str, color: &str) -> Result<Category, AppError> {
        let name = validate_category_name(name)?;
        let color = validate_color(color)?;
        self.ensure_name_free(name, None)?;

        let category = Category::new(&Uuid::new_v4().to_string(), name, color);
        let mut next = self.categories.clone();
        next.push(category.clone());
        self.commit_categories(next)?;

        info!("Added category '{name}'");
        Ok(category)
    }

    pub fn update_category(&mut self, id: &str, name: &str, color: &str) -> Result<Category, AppError> {
        let name = validate_category_name(name)?;
        let color = validate_color(color)?;
        self.ensure_name_free(name, Some(id))?;

        let mut next = self.categories.clone();
        let target = next
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| category_not_found(id))?;
        target.name = name.to_string();
        target.color = color.to_string();
        let updated = target.clone();

        self.commit_categories(next)?;
        Ok(updated)
    }

    /// Remove a category no schedule refers to.
    pub fn delete_category(&mut self, id: &str) -> Result<(), AppError> {
        if self.category(id).is_none() {
            return Err(category_not_found(id));
        }

        let in_use = self.schedules.iter().filter(|s| s.category_id == id).count();
        if in_use > 0 {
            return Err(AppError::DeleteFailed {
                reason: format!("category is used by {in_use} schedule(s)"),
            });
        }

        let next: Vec<Category> = self.categories.iter().filter(|c| c.id != id).cloned().collect();
        self.commit_categories(next)?;

        info!("Deleted category {id}");
        Ok(())
    }

    fn ensure_name_free(&self, name: &str, except_id: Option<&str>) -> Result<(), AppError> {
        let taken = self
            .categories
            .iter()
            .any(|c| Some(c.id.as_str()) != except_id && c.name.eq_ignore_ascii_case(name));
        if taken {
            return Err(AppError::AlreadyExists {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

fn category_not_found(id: &str) -> AppError {
    AppError::NotFound {
        entity: "Category",
        id: id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::constants::CATEGORIES_KEY;
    use crate::db::{load_json, KeyValueStore};
    use crate::dtos::ScheduleDraft;
    use crate::error::AppError;
    use crate::models::Category;
    use crate::test_utils::{memory_store, utc};

    #[test]
    fn test_add_category() {
        let mut store = memory_store();

        let study = store.add_category(" Study ", "#FFC107").unwrap();

        assert_eq!(study.name, "Study");
        assert_eq!(store.categories().len(), 5);
        assert_eq!(store.category(&study.id), Some(&study));
        let persisted: Vec<Category> = load_json(store.storage(), CATEGORIES_KEY).unwrap().unwrap();
        assert_eq!(persisted, store.categories());
    }

    #[test]
    fn test_add_category_rejects_duplicates_and_bad_input() {
        let mut store = memory_store();

        assert!(matches!(store.add_category("work", "#000"), Err(AppError::AlreadyExists { .. })));
        assert!(matches!(store.add_category("", "#000"), Err(AppError::InvalidInput { .. })));
        assert!(matches!(store.add_category("Gym", "red"), Err(AppError::InvalidInput { .. })));
        assert_eq!(store.categories().len(), 4);
    }

    #[test]
    fn test_update_category() {
        let mut store = memory_store();

        let renamed = store.update_category("1", "Job", "#111111").unwrap();
        assert_eq!(renamed.name, "Job");
        assert_eq!(store.category("1").unwrap().color, "#111111");

        // Keeping its own name is not a conflict
        assert!(store.update_category("1", "Job", "#222222").is_ok());
        assert!(matches!(
            store.update_category("1", "Personal", "#222222"),
            Err(AppError::AlreadyExists { .. })
        ));
        assert!(matches!(
            store.update_category("missing", "X", "#222222"),
            Err(AppError::NotFound { .. })
        ));
    }

    #[test]
    fn test_delete_category_in_use() {
        let mut store = memory_store();
        store
            .create(&ScheduleDraft::new("Gym", "2", utc(2024, 1, 1, 7, 0), utc(2024, 1, 1, 8, 0)))
            .unwrap();

        assert!(matches!(store.delete_category("2"), Err(AppError::DeleteFailed { .. })));
        store.delete_category("4").unwrap();

        assert!(store.category("4").is_none());
        assert_eq!(store.categories().len(), 3);
        assert!(store.storage().get(CATEGORIES_KEY).unwrap().is_some());
        assert!(matches!(store.delete_category("4"), Err(AppError::NotFound { .. })));
    }
}
