use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>, user: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    if let Some(name) = user {
        settings.user_name = name;
    }

    let dir = std::path::PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&dir)?;
    let db_path = dir.join("cashup.db");
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    save_settings(&settings)?;

    println!("Initialized database at {}", db_path.display());
    if settings.user_name.is_empty() {
        println!("No user set; run `cashup init --user <name>` before importing.");
    } else {
        println!("User: {}", settings.user_name);
    }
    Ok(())
}
