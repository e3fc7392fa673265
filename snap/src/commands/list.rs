use anyhow::Result;

use snap_core::snap_println;
use snap_provider::{DigitalOcean, Droplet, DropletApi};

pub fn handle_list<A: DropletApi>(adapter: &DigitalOcean<A>) -> Result<()> {
    let droplets = adapter.list()?;
    if droplets.is_empty() {
        snap_println!("No droplets found");
        return Ok(());
    }

    snap_println!("{:<12} {:<32} {:<8} SNAPSHOTS", "ID", "NAME", "STATUS");
    for droplet in &droplets {
        snap_println!("{}", format_row(droplet));
    }
    Ok(())
}

fn format_row(droplet: &Droplet) -> String {
    format!(
        "{:<12} {:<32} {:<8} {}",
        droplet.id,
        droplet.name,
        droplet.status.to_string(),
        droplet.snapshot_count()
    )
}
