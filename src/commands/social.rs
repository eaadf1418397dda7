use crate::cli::SocialCommand;
use crate::commands::{CliError, CommandContext};
use crate::services::cesium::PodClient;
use crate::services::compose::MessageDraft;
use crate::services::geoloc::ProfileGeolocator;
use crate::services::gva::GvaClient;
use crate::services::output::print_json;
use crate::services::wallets::WalletAggregator;
use anyhow::Context;

pub fn handle_social_commands(
    cmd: &SocialCommand,
    ctx: &CommandContext<'_>,
) -> anyhow::Result<()> {
    let pod = PodClient::new(ctx.address, ctx.settings.timeout_secs)?;
    tracing::debug!(pod = ctx.address, keyless = ctx.no_credential_needed, "social command");
    match cmd {
        SocialCommand::Get(a) => {
            let who = match &a.profile {
                Some(p) => p.clone(),
                None => ctx.credential.pubkey()?,
            };
            let profile = pod
                .profile(&who, a.avatar)?
                .ok_or_else(|| anyhow::anyhow!("No profile found for {}", who))?;
            print_json(&profile)?;
        }
        SocialCommand::Page(a) => {
            let id = a
                .page
                .as_deref()
                .context("a page id is required (--page)")?;
            let page = pod
                .page(id, a.avatar)?
                .ok_or_else(|| anyhow::anyhow!("No page found for {}", id))?;
            print_json(&page)?;
        }
        SocialCommand::Stars(a) => {
            if a.number.is_some() {
                return Err(CliError::Unsupported("stars -n").into());
            }
            let who = match &a.profile {
                Some(p) => p.clone(),
                None => ctx.credential.pubkey()?,
            };
            print_json(&pod.stars(&who)?)?;
        }
        SocialCommand::GetOffer(a) => {
            let id = a.id.as_deref().context("an offer id is required (--id)")?;
            let offer = pod
                .offer(id)?
                .ok_or_else(|| anyhow::anyhow!("No offer found for {}", id))?;
            print_json(&offer)?;
        }
        SocialCommand::GeolocProfiles => {
            let gva = GvaClient::new(&ctx.settings.node, ctx.settings.timeout_secs)?;
            let wallets = WalletAggregator::new(&gva, ctx.settings.wallet_page_size);
            let report = ProfileGeolocator::new(&pod, wallets).locate()?;
            print_json(&report)?;
        }
        SocialCommand::Send(a) => {
            if !ctx.messenger.available() {
                return Err(CliError::Unsupported("send").into());
            }
            let stdin = std::io::stdin();
            let draft = MessageDraft::resolve(
                a.titre.as_deref(),
                a.message.as_deref(),
                a.fichier.as_deref(),
                &mut stdin.lock(),
                &mut std::io::stderr(),
            )?;
            tracing::debug!(
                recipient = %a.destinataire,
                title = %draft.title,
                body_len = draft.body.len(),
                "message drafted"
            );
            ctx.messenger.deliver(&a.destinataire, &draft, a.outbox)?;
        }
        SocialCommand::Read(_) => return Err(CliError::Unsupported("read").into()),
        SocialCommand::Delete(_) => return Err(CliError::Unsupported("delete").into()),
        SocialCommand::Set(_) => return Err(CliError::Unsupported("set").into()),
        SocialCommand::Erase => return Err(CliError::Unsupported("erase").into()),
        SocialCommand::Unstars(_) => return Err(CliError::Unsupported("unstars").into()),
        SocialCommand::SetOffer(_) => return Err(CliError::Unsupported("setoffer").into()),
        SocialCommand::DeleteOffer(_) => {
            return Err(CliError::Unsupported("deleteoffer").into())
        }
    }
    Ok(())
}
