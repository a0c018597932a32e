//! `chatex chats` – list chats in an archive.

use anyhow::Result;
use chatex_core::archive::ChatArchive;
use std::path::Path;

pub fn run_chats(archive: &Path, limit: usize) -> Result<()> {
    let archive = ChatArchive::load(archive)?;
    let chats = archive.dialogs(limit);
    if chats.is_empty() {
        println!("No chats in archive.");
        return Ok(());
    }
    println!("{:<4} {:<14} {:<8} {}", "#", "ID", "MSGS", "NAME");
    for (i, chat) in chats.iter().enumerate() {
        println!(
            "{:<4} {:<14} {:<8} {}",
            i + 1,
            chat.id,
            chat.messages.len(),
            chat.name
        );
    }
    Ok(())
}
