// Admin gate for the mutating club commands.

use super::{Context, Error};

/// True when the caller holds one of the configured admin roles.
///
/// Outside a guild (or when the member can't be loaded) nobody is an admin.
pub async fn caller_is_admin(ctx: Context<'_>) -> Result<bool, Error> {
    let Some(member) = ctx.author_member().await else {
        return Ok(false);
    };

    let roles: Vec<u64> = member.roles.iter().map(|role| role.get()).collect();
    Ok(ctx.data().config.is_admin(&roles))
}

/// Checks the caller and logs the refusal. Commands return early and silently
/// when this is false.
pub async fn require_admin(ctx: Context<'_>) -> Result<bool, Error> {
    let allowed = caller_is_admin(ctx).await?;
    if !allowed {
        tracing::debug!(
            user_id = ctx.author().id.get(),
            command = %ctx.command().qualified_name,
            "Ignoring admin command from non-admin"
        );
    }
    Ok(allowed)
}
