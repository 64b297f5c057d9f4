use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use campusflow_engine::EvaluatorRegistry;
use campusflow_policy::EntityType;
use campusflow_service::{
  AdmissionService, CertificateService, CreateApplicationParams, CreateCertificateParams,
  CreateEnquiryParams, CreateIncidentParams, CreateTicketParams, EnquiryService, IncidentService,
  PolicyService, SupportTicketService,
};
use campusflow_store::SqliteStore;

/// Campusflow - configurable entity-status workflows for school consoles
#[derive(Parser)]
#[command(name = "campusflow")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.campusflow)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Tenant the command operates on
  #[arg(long, global = true, default_value = "default")]
  tenant: String,

  /// Actor recorded in the audit trail
  #[arg(long, global = true)]
  actor: Option<String>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Inspect or replace a tenant's transition policy
  Policy {
    #[command(subcommand)]
    action: PolicyAction,
  },

  /// Inspect or replace a tenant's admission document type list
  DocTypes {
    #[command(subcommand)]
    action: DocTypesAction,
  },

  /// Admission enquiries
  Enquiry {
    #[command(subcommand)]
    action: EnquiryAction,
  },

  /// Admission applications
  Application {
    #[command(subcommand)]
    action: ApplicationAction,
  },

  /// Certificate requests
  Certificate {
    #[command(subcommand)]
    action: CertificateAction,
  },

  /// Support desk tickets
  Ticket {
    #[command(subcommand)]
    action: TicketAction,
  },

  /// Platform incidents
  Incident {
    #[command(subcommand)]
    action: IncidentAction,
  },
}

#[derive(Subcommand)]
enum PolicyAction {
  /// Print the effective policy for an entity type
  Show { entity_type: String },

  /// Replace the policy from a JSON file (`-` reads stdin)
  Set {
    entity_type: String,
    policy_file: PathBuf,
  },
}

#[derive(Subcommand)]
enum DocTypesAction {
  Show,
  Set {
    /// Document type names
    types: Vec<String>,
  },
}

#[derive(Subcommand)]
enum EnquiryAction {
  Create {
    #[arg(long)]
    student_name: String,
    #[arg(long)]
    parent_name: Option<String>,
    #[arg(long)]
    grade: Option<String>,
    #[arg(long)]
    academic_year: Option<String>,
    #[arg(long)]
    phone: Option<String>,
  },
  List {
    #[arg(long)]
    status: Option<String>,
  },
  SetStatus {
    id: String,
    status: String,
  },
}

#[derive(Subcommand)]
enum ApplicationAction {
  /// Create an application out of an enquiry
  Create {
    #[arg(long)]
    enquiry: String,
    /// Extra form data as a JSON file (`-` reads stdin)
    #[arg(long)]
    form_file: Option<PathBuf>,
  },
  Show {
    id: String,
  },
  List {
    #[arg(long)]
    status: Option<String>,
  },
  AttachDoc {
    id: String,
    #[arg(long)]
    doc_type: String,
    #[arg(long)]
    url: Option<String>,
  },
  RemoveDoc {
    id: String,
    #[arg(long)]
    index: usize,
  },
  RecordFee {
    id: String,
    #[arg(long)]
    amount: i64,
    #[arg(long)]
    reference: Option<String>,
  },
  SetStatus {
    id: String,
    status: String,
  },
  /// Admit the application and provision the student record
  Accept {
    id: String,
    #[arg(long)]
    section: String,
  },
}

#[derive(Subcommand)]
enum CertificateAction {
  Create {
    #[arg(long)]
    student_name: String,
    #[arg(long)]
    cert_type: String,
    #[arg(long)]
    purpose: Option<String>,
  },
  List {
    #[arg(long)]
    status: Option<String>,
  },
  SetStatus {
    id: String,
    status: String,
  },
}

#[derive(Subcommand)]
enum TicketAction {
  Create {
    #[arg(long)]
    subject: String,
    #[arg(long)]
    priority: Option<String>,
    #[arg(long)]
    requester: Option<String>,
  },
  List {
    #[arg(long)]
    status: Option<String>,
  },
  SetStatus {
    id: String,
    status: String,
  },
}

#[derive(Subcommand)]
enum IncidentAction {
  Create {
    #[arg(long)]
    title: String,
    #[arg(long)]
    severity: Option<String>,
    #[arg(long)]
    scope: Option<String>,
  },
  List {
    #[arg(long)]
    status: Option<String>,
  },
  SetStatus {
    id: String,
    status: String,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir.clone() {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".campusflow"),
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run(cli, data_dir).await })
}

async fn run(cli: Cli, data_dir: PathBuf) -> Result<()> {
  let store = open_store(&data_dir).await?;
  let registry = Arc::new(EvaluatorRegistry::builtin());
  let tenant = cli.tenant.as_str();
  let actor = cli.actor.as_deref();

  match cli.command {
    Commands::Policy { action } => {
      let policies = PolicyService::new(store);
      match action {
        PolicyAction::Show { entity_type } => {
          let entity_type = parse_entity_type(&entity_type)?;
          let policy = policies.load(tenant, entity_type).await?;
          print_json(&policy)
        }
        PolicyAction::Set {
          entity_type,
          policy_file,
        } => {
          let entity_type = parse_entity_type(&entity_type)?;
          let payload = read_json(&policy_file).await?;
          let policy = policies.save(tenant, entity_type, &payload, actor).await?;
          print_json(&policy)
        }
      }
    }

    Commands::DocTypes { action } => {
      let policies = PolicyService::new(store);
      match action {
        DocTypesAction::Show => {
          let types = policies.document_types(tenant).await?;
          print_json(&types)
        }
        DocTypesAction::Set { types } => {
          let saved = policies.save_document_types(tenant, &types, actor).await?;
          print_json(&saved)
        }
      }
    }

    Commands::Enquiry { action } => {
      let enquiries = EnquiryService::new(store, registry);
      match action {
        EnquiryAction::Create {
          student_name,
          parent_name,
          grade,
          academic_year,
          phone,
        } => {
          let record = enquiries
            .create(
              tenant,
              CreateEnquiryParams {
                student_name,
                parent_name,
                grade_interested: grade,
                academic_year,
                contact_phone: phone,
              },
              actor,
            )
            .await?;
          print_json(&record)
        }
        EnquiryAction::List { status } => {
          let records = enquiries.list(tenant, status.as_deref()).await?;
          print_json(&records)
        }
        EnquiryAction::SetStatus { id, status } => {
          let outcome = enquiries.set_status(tenant, &id, &status, actor).await?;
          print_json(&outcome.entity)
        }
      }
    }

    Commands::Application { action } => {
      let admissions = AdmissionService::new(store, registry);
      match action {
        ApplicationAction::Create { enquiry, form_file } => {
          let form_data = match form_file {
            Some(path) => Some(read_json(&path).await?),
            None => None,
          };
          let record = admissions
            .create_application(
              tenant,
              CreateApplicationParams {
                enquiry_id: enquiry,
                form_data,
              },
              actor,
            )
            .await?;
          print_json(&record)
        }
        ApplicationAction::Show { id } => {
          let record = admissions.get(tenant, &id).await?;
          print_json(&record)
        }
        ApplicationAction::List { status } => {
          let records = admissions.list(tenant, status.as_deref()).await?;
          print_json(&records)
        }
        ApplicationAction::AttachDoc { id, doc_type, url } => {
          let record = admissions
            .attach_document(tenant, &id, &doc_type, url.as_deref(), actor)
            .await?;
          print_json(&record)
        }
        ApplicationAction::RemoveDoc { id, index } => {
          let record = admissions.remove_document(tenant, &id, index, actor).await?;
          print_json(&record)
        }
        ApplicationAction::RecordFee {
          id,
          amount,
          reference,
        } => {
          let record = admissions
            .record_fee_payment(tenant, &id, amount, reference.as_deref(), actor)
            .await?;
          print_json(&record)
        }
        ApplicationAction::SetStatus { id, status } => {
          let outcome = admissions.set_status(tenant, &id, &status, actor).await?;
          print_json(&outcome.entity)
        }
        ApplicationAction::Accept { id, section } => {
          let outcome = admissions.accept(tenant, &id, &section, actor).await?;
          print_json(&outcome.entity)
        }
      }
    }

    Commands::Certificate { action } => {
      let certificates = CertificateService::new(store, registry);
      match action {
        CertificateAction::Create {
          student_name,
          cert_type,
          purpose,
        } => {
          let record = certificates
            .create_request(
              tenant,
              CreateCertificateParams {
                student_name,
                certificate_type: cert_type,
                purpose,
              },
              actor,
            )
            .await?;
          print_json(&record)
        }
        CertificateAction::List { status } => {
          let records = certificates.list(tenant, status.as_deref()).await?;
          print_json(&records)
        }
        CertificateAction::SetStatus { id, status } => {
          let outcome = certificates.set_status(tenant, &id, &status, actor).await?;
          print_json(&outcome.entity)
        }
      }
    }

    Commands::Ticket { action } => {
      let tickets = SupportTicketService::new(store, registry);
      match action {
        TicketAction::Create {
          subject,
          priority,
          requester,
        } => {
          let record = tickets
            .create(
              tenant,
              CreateTicketParams {
                subject,
                priority,
                requester,
              },
              actor,
            )
            .await?;
          print_json(&record)
        }
        TicketAction::List { status } => {
          let records = tickets.list(tenant, status.as_deref()).await?;
          print_json(&records)
        }
        TicketAction::SetStatus { id, status } => {
          let outcome = tickets.set_status(tenant, &id, &status, actor).await?;
          print_json(&outcome.entity)
        }
      }
    }

    Commands::Incident { action } => {
      let incidents = IncidentService::new(store, registry);
      match action {
        IncidentAction::Create {
          title,
          severity,
          scope,
        } => {
          let record = incidents
            .create(
              tenant,
              CreateIncidentParams {
                title,
                severity,
                scope,
              },
              actor,
            )
            .await?;
          print_json(&record)
        }
        IncidentAction::List { status } => {
          let records = incidents.list(tenant, status.as_deref()).await?;
          print_json(&records)
        }
        IncidentAction::SetStatus { id, status } => {
          let outcome = incidents.set_status(tenant, &id, &status, actor).await?;
          print_json(&outcome.entity)
        }
      }
    }
  }
}

async fn open_store(data_dir: &Path) -> Result<Arc<SqliteStore>> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let db_path = data_dir.join("campusflow.db");
  let options = sqlx::sqlite::SqliteConnectOptions::new()
    .filename(&db_path)
    .create_if_missing(true);
  let pool = sqlx::sqlite::SqlitePoolOptions::new()
    .connect_with(options)
    .await
    .with_context(|| format!("failed to open database: {}", db_path.display()))?;

  let store = SqliteStore::new(pool);
  store.migrate().await.context("failed to run migrations")?;
  Ok(Arc::new(store))
}

fn parse_entity_type(raw: &str) -> Result<EntityType> {
  raw.parse::<EntityType>().map_err(Into::into)
}

/// Read a JSON value from a file, or from stdin when the path is `-`.
async fn read_json(path: &Path) -> Result<serde_json::Value> {
  let content = if path == Path::new("-") {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    buffer
  } else {
    tokio::fs::read_to_string(path)
      .await
      .with_context(|| format!("failed to read file: {}", path.display()))?
  };
  serde_json::from_str(&content).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
