//! Category management commands for CLI.

use clap::Subcommand;
use aitas_core::category::{Category, ScalingWeight};
use aitas_core::storage::Database;
use aitas_core::suggestion::PendingCategoryReview;

#[derive(Subcommand)]
pub enum CategoryAction {
    /// Create a new category
    Add {
        /// Category name
        name: String,
        /// Scaling weight: strict, normal, relaxed (default: normal)
        #[arg(long, default_value = "normal")]
        scaling: String,
        /// Mark as the default (fallback) category
        #[arg(long)]
        default: bool,
        /// Parent category ID
        #[arg(long)]
        parent: Option<String>,
    },
    /// List categories
    List,
    /// Show the pending category-review flag, if raised
    ReviewFlag,
    /// Dismiss the pending category-review flag
    ClearFlag,
}

pub fn run(action: CategoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;

    match action {
        CategoryAction::Add {
            name,
            scaling,
            default,
            parent,
        } => {
            let mut category = Category::new(name).with_scaling(ScalingWeight::parse(&scaling));
            if default {
                category = category.as_default();
            }
            category.parent_id = parent;

            db.insert_category(&category)?;
            println!("Category created: {}", category.id);
            println!("{}", serde_json::to_string_pretty(&category)?);
        }
        CategoryAction::List => {
            let categories = db.all_categories()?;
            println!("{}", serde_json::to_string_pretty(&categories)?);
        }
        CategoryAction::ReviewFlag => match PendingCategoryReview::load(&db)? {
            Some(flag) => println!("{}", serde_json::to_string_pretty(&flag)?),
            None => println!("No category review pending"),
        },
        CategoryAction::ClearFlag => {
            PendingCategoryReview::clear(&mut db)?;
            println!("Category review flag cleared");
        }
    }
    Ok(())
}
