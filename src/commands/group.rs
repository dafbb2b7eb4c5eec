use anyhow::Result;
use uuid::Uuid;

use ringroute::config::Config;
use ringroute::directory::Directory;
use ringroute::models::Group;

pub fn put(
    config: &Config,
    id: Option<String>,
    name: String,
    timezone: String,
    default_target: Option<String>,
) -> Result<()> {
    let directory = Directory::new(super::store(config)?);

    let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let group = Group {
        id,
        name,
        timezone,
        default_target,
    };
    directory.put(&group)?;

    tracing::info!(group = %group.id, "Group saved");
    println!("{}", group.id);
    Ok(())
}

pub fn get(config: &Config, id: &str) -> Result<()> {
    let group = Directory::new(super::store(config)?).get(id)?;
    println!("{}", serde_json::to_string_pretty(&group)?);
    Ok(())
}

pub fn list(config: &Config) -> Result<()> {
    let groups = Directory::new(super::store(config)?).list()?;

    for group in &groups {
        println!(
            "{}\t{}\t{}\t{}",
            group.id,
            group.name,
            group.timezone,
            group.default_target().unwrap_or("-")
        );
    }
    tracing::debug!(count = groups.len(), "Groups listed");
    Ok(())
}

pub fn delete(config: &Config, id: &str) -> Result<()> {
    let directory = Directory::new(super::store(config)?);
    if !directory.delete(id)? {
        anyhow::bail!("Group not found: {id}");
    }
    println!("Deleted group {id}");
    Ok(())
}
