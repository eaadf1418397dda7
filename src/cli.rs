use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "jaklis",
    about = "CLI Client for Cesium+ and Ḡchange",
    disable_version_flag = true
)]
pub struct Cli {
    #[arg(short = 'v', long, help = "Display the current program version")]
    pub version: bool,
    #[arg(short = 'k', long, help = "Path to the keyfile (PubSec)")]
    pub key: Option<PathBuf>,
    #[arg(
        short = 'n',
        long,
        help = "Address of the Cesium+, Gchange, or Duniter node to use"
    )]
    pub node: Option<String>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Every command, split by the backend that serves it.
#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(flatten)]
    Social(SocialCommand),
    #[command(flatten)]
    Ledger(LedgerCommand),
}

#[derive(Subcommand, Debug)]
pub enum SocialCommand {
    /// Read messages
    Read(ReadArgs),
    /// Send a message
    Send(SendArgs),
    /// Delete a message
    Delete(DeleteArgs),
    /// View a Cesium+ profile
    Get(GetArgs),
    /// View a Cesium+ page
    Page(PageArgs),
    /// Configure your Cesium+ profile
    Set(SetArgs),
    /// Erase your Cesium+ profile
    Erase,
    /// View a profile's stars / Rate a profile (option -n RATING)
    Stars(StarsArgs),
    /// Remove a star
    Unstars(UnstarsArgs),
    /// Get information about a Ḡchange listing
    #[command(name = "getoffer")]
    GetOffer(OfferIdArgs),
    /// Create a Ḡchange listing
    #[command(name = "setoffer")]
    SetOffer(SetOfferArgs),
    /// Delete a Ḡchange listing
    #[command(name = "deleteoffer")]
    DeleteOffer(OfferIdArgs),
    /// Get JSON of all geolocated accounts
    #[command(name = "geolocProfiles")]
    GeolocProfiles,
}

#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// Pay in Ḡ1
    Pay(PayArgs),
    /// View Ḡ1 account transaction history
    History(HistoryArgs),
    /// View Ḡ1 account balance
    Balance(BalanceArgs),
    /// View public key/username identity
    Id(IdArgs),
    /// View public key/username identity and balance
    #[command(name = "idBalance")]
    IdBalance(PubkeyArgs),
    /// Display the current Universal Dividend amount
    #[command(name = "currentUd")]
    CurrentUd(PubkeyArgs),
    /// List all G1 wallets
    #[command(name = "listWallets")]
    ListWallets(ListWalletsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    #[arg(short = 'n', long, default_value_t = 3, help = "Display the last NUMBER messages")]
    pub number: i64,
    #[arg(short = 'j', long, help = "Output in JSON format")]
    pub json: bool,
    #[arg(short = 'o', long, help = "Read sent messages")]
    pub outbox: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    #[arg(short = 'd', long, required = true, help = "Recipient of the message")]
    pub destinataire: String,
    #[arg(short = 't', long, help = "Title of the message to send")]
    pub titre: Option<String>,
    #[arg(short = 'm', long, help = "Message to send")]
    pub message: Option<String>,
    #[arg(short = 'f', long, help = "Send the message from the 'FILE'")]
    pub fichier: Option<PathBuf>,
    #[arg(short = 'o', long, help = "Send the message to the outbox")]
    pub outbox: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(
        short = 'i',
        long,
        required = true,
        num_args = 1..,
        action = ArgAction::Append,
        help = "ID(s) of the message(s) to delete"
    )]
    pub id: Vec<String>,
    #[arg(short = 'o', long, help = "Delete a sent message")]
    pub outbox: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    #[arg(short = 'p', long, help = "Profile name or public key")]
    pub profile: Option<String>,
    #[arg(short = 'a', long, help = "Also retrieve the avatar in raw base64 format")]
    pub avatar: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    #[arg(short = 'p', long, help = "Page name")]
    pub page: Option<String>,
    #[arg(
        short = 'a',
        long,
        help = "Also retrieve the page's avatar in raw base64 format"
    )]
    pub avatar: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    #[arg(short = 'n', long, help = "Profile name")]
    pub name: Option<String>,
    #[arg(short = 'd', long, help = "Profile description")]
    pub description: Option<String>,
    #[arg(short = 'v', long, help = "Profile city")]
    pub ville: Option<String>,
    #[arg(short = 'a', long, help = "Profile address")]
    pub adresse: Option<String>,
    #[arg(
        long,
        visible_alias = "pos",
        num_args = 2,
        value_names = ["LAT", "LON"],
        help = "Geographical coordinates (lat + lon)"
    )]
    pub position: Option<Vec<f64>>,
    #[arg(short = 's', long, help = "Profile website")]
    pub site: Option<String>,
    #[arg(short = 'A', long, help = "Path to profile avatar in PNG")]
    pub avatar: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StarsArgs {
    #[arg(short = 'p', long, help = "Target profile")]
    pub profile: Option<String>,
    #[arg(short = 'n', long, help = "Number of stars")]
    pub number: Option<i64>,
}

#[derive(Args, Debug, Clone)]
pub struct UnstarsArgs {
    #[arg(short = 'p', long, help = "Profile to unstar")]
    pub profile: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct OfferIdArgs {
    #[arg(short = 'i', long, help = "Target listing")]
    pub id: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SetOfferArgs {
    #[arg(short = 't', long, help = "Title of the listing to create")]
    pub title: Option<String>,
    #[arg(short = 'd', long, help = "Description of the listing to create")]
    pub description: Option<String>,
    #[arg(short = 'c', long, help = "Category of the listing to create")]
    pub category: Option<String>,
    #[arg(
        short = 'l',
        long,
        num_args = 2,
        value_names = ["LAT", "LON"],
        help = "Location of the listing to create (lat + lon)"
    )]
    pub location: Option<Vec<f64>>,
    #[arg(short = 'p', long, help = "Image of the listing to create")]
    pub picture: Option<PathBuf>,
    #[arg(long, visible_alias = "ci", help = "City of the listing to create")]
    pub city: Option<String>,
    #[arg(long, visible_alias = "pr", help = "Price of the listing to create")]
    pub price: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PayArgs {
    #[arg(short = 'p', long, help = "Payment recipient")]
    pub pubkey: Option<String>,
    #[arg(short = 'a', long, help = "Transaction amount")]
    pub amount: Option<f64>,
    #[arg(short = 'c', long, num_args = 0.., help = "Transaction comment")]
    pub comment: Vec<String>,
    #[arg(short = 'm', long, help = "Use mempool sources")]
    pub mempool: bool,
    #[arg(short = 'v', long, help = "Display the JSON result of the transaction")]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    #[arg(short = 'p', long, help = "Public key of the target account")]
    pub pubkey: Option<String>,
    #[arg(
        short = 'n',
        long,
        default_value_t = 10,
        help = "Display the last NUMBER transactions"
    )]
    pub number: i64,
    #[arg(short = 'j', long, help = "Display the result in JSON format")]
    pub json: bool,
    #[arg(long, help = "Display the result in black and white")]
    pub nocolors: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BalanceArgs {
    #[arg(short = 'p', long, help = "Public key of the target account")]
    pub pubkey: Option<String>,
    #[arg(short = 'm', long, help = "Use mempool sources")]
    pub mempool: bool,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    #[arg(short = 'p', long, help = "Public key of the target account")]
    pub pubkey: Option<String>,
    #[arg(short = 'u', long, help = "Username of the target account")]
    pub username: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct PubkeyArgs {
    #[arg(short = 'p', long, help = "Public key of the target account")]
    pub pubkey: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListWalletsArgs {
    #[arg(short = 'm', long, help = "Only list member wallets")]
    pub mbr: bool,
    #[arg(
        long = "non_mbr",
        visible_alias = "nm",
        help = "Only list wallets whose identity is not a member"
    )]
    pub non_mbr: bool,
    #[arg(short = 'l', long, help = "Only list wallets that carry an identity record")]
    pub larf: bool,
    #[arg(short = 'b', long, help = "Display a raw list of pubkeys instead of JSON")]
    pub brut: bool,
}

impl Commands {
    /// Identifier that makes key resolution unnecessary for read-only lookups.
    pub fn public_identifier(&self) -> Option<&str> {
        match self {
            Commands::Social(SocialCommand::Get(a)) => a.profile.as_deref(),
            Commands::Social(SocialCommand::Page(a)) => a.page.as_deref(),
            Commands::Ledger(LedgerCommand::History(a)) => a.pubkey.as_deref(),
            Commands::Ledger(LedgerCommand::Balance(a)) => a.pubkey.as_deref(),
            Commands::Ledger(LedgerCommand::Id(a)) => {
                a.pubkey.as_deref().or(a.username.as_deref())
            }
            Commands::Ledger(LedgerCommand::IdBalance(a)) => a.pubkey.as_deref(),
            _ => None,
        }
    }
}
