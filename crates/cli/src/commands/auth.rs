//! Session token commands.

use std::io::Write;

use secrecy::SecretString;

use cartsync_client::Session;

use super::CliError;

pub async fn login(session: &Session, token: String) -> Result<(), CliError> {
    session.login(SecretString::from(token)).await?;

    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "Signed in: {} cart line(s), {} address(es)",
        session.cart().items().await.len(),
        session.addresses().addresses().await.len()
    )?;
    Ok(())
}

pub async fn logout(session: Session) -> Result<(), CliError> {
    session.logout().await?;
    writeln!(std::io::stdout().lock(), "Signed out")?;
    Ok(())
}
