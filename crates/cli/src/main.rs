use chrono::{Local, NaiveTime};
use clap::{Parser, Subcommand};
use homecare_core::{
    constants::DEFAULT_DATA_DIR, CoreConfig, MedicationSource, NewMedication, NewPatient,
    NonEmptyText, NotificationDispatcher, PassSummary, PhoneNumber, RecordId, RecordStore,
    ReminderConfig, ReminderEvaluator, ScheduleTime,
};
use homecare_messaging::{LogDispatcher, TwilioConfig, TwilioDispatcher};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "homecare")]
#[command(about = "Homecare patient, medication and reminder CLI")]
struct Cli {
    /// Data directory (defaults to HOMECARE_DATA_DIR, then ./homecare_data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patients
    ListPatients,
    /// Register a patient
    AddPatient {
        /// Full name
        name: String,
        /// Phone number (local, or international with a leading +)
        phone: String,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        city: Option<String>,
    },
    /// Change a patient's phone number
    SetPhone {
        patient_id: String,
        phone: String,
    },
    /// Delete a patient and all of their medications
    DeletePatient {
        patient_id: String,
    },
    /// Prescribe a medication to a patient
    AddMedication {
        patient_id: String,
        name: String,
        /// Dose amount
        #[arg(long)]
        dose: Option<f64>,
        /// Doses per day
        #[arg(long)]
        frequency: Option<u32>,
        #[arg(long)]
        description: Option<String>,
        /// Times of day, comma-separated (HH:MM or HH:MM:SS)
        #[arg(long, value_delimiter = ',')]
        times: Vec<String>,
    },
    /// List medications, optionally for one patient
    ListMedications {
        #[arg(long)]
        patient: Option<String>,
    },
    /// Replace a medication's times of day
    SetTimes {
        medication_id: String,
        /// Times of day, comma-separated (HH:MM or HH:MM:SS)
        #[arg(value_delimiter = ',')]
        times: Vec<String>,
    },
    /// Delete one medication
    DeleteMedication {
        medication_id: String,
    },
    /// Show which reminders are due, without sending anything
    Due {
        /// Time of day to evaluate (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Run one reminder pass
    Remind {
        /// Time of day to evaluate (defaults to now)
        #[arg(long)]
        at: Option<String>,
        /// Log messages instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Attach a PNG or JPEG profile image to a patient
    AttachImage {
        patient_id: String,
        path: PathBuf,
    },
    /// Attach a DICOM imaging file to a patient
    AttachDicom {
        patient_id: String,
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let data_dir = cli
        .data_dir
        .or_else(|| std::env::var("HOMECARE_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let store = RecordStore::new(Arc::new(CoreConfig::new(data_dir)?));

    match cli.command {
        Some(Commands::ListPatients) => {
            let patients = store.list_patients()?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in patients {
                    println!(
                        "ID: {}, Name: {}, Phone: {}, Created: {}",
                        patient.id,
                        patient.name,
                        patient.phone,
                        patient.created_at.to_rfc3339()
                    );
                }
            }
        }
        Some(Commands::AddPatient {
            name,
            phone,
            gender,
            address,
            city,
        }) => {
            let mut new = NewPatient::new(NonEmptyText::new(name)?, PhoneNumber::new(phone)?);
            new.gender = optional_text(gender)?;
            new.address = optional_text(address)?;
            new.city = optional_text(city)?;
            let patient = store.create_patient(new)?;
            println!("Created patient with ID: {}", patient.id);
        }
        Some(Commands::SetPhone { patient_id, phone }) => {
            let patient =
                store.update_patient_phone(&RecordId::parse(&patient_id)?, PhoneNumber::new(phone)?)?;
            println!("Updated phone for {} to {}", patient.id, patient.phone);
        }
        Some(Commands::DeletePatient { patient_id }) => {
            let removed = store.delete_patient(&RecordId::parse(&patient_id)?)?;
            println!("Deleted patient {patient_id} and {removed} medication(s)");
        }
        Some(Commands::AddMedication {
            patient_id,
            name,
            dose,
            frequency,
            description,
            times,
        }) => {
            let mut new = NewMedication::new(NonEmptyText::new(name)?);
            new.dose = dose;
            new.dose_frequency = frequency;
            new.description = optional_text(description)?;
            new.usage_times = parse_times(&times)?;
            let medication = store.add_medication(&RecordId::parse(&patient_id)?, new)?;
            println!("Added medication with ID: {}", medication.id);
        }
        Some(Commands::ListMedications { patient }) => {
            let medications = match patient {
                Some(id) => store.medications_for_patient(&RecordId::parse(&id)?)?,
                None => store.list_medications()?,
            };
            if medications.is_empty() {
                println!("No medications found.");
            } else {
                for medication in medications {
                    let times: Vec<String> =
                        medication.usage_times.iter().map(|t| t.to_string()).collect();
                    println!(
                        "ID: {}, Patient: {}, Name: {}, Dose: {}, Times: {}",
                        medication.id,
                        medication.patient_id,
                        medication.name,
                        homecare_core::reminders::format_dose(medication.dose),
                        times.join(",")
                    );
                }
            }
        }
        Some(Commands::SetTimes {
            medication_id,
            times,
        }) => {
            let medication =
                store.set_usage_times(&RecordId::parse(&medication_id)?, parse_times(&times)?)?;
            println!(
                "Medication {} now has {} scheduled time(s)",
                medication.id,
                medication.usage_times.len()
            );
        }
        Some(Commands::DeleteMedication { medication_id }) => {
            store.delete_medication(&RecordId::parse(&medication_id)?)?;
            println!("Deleted medication {medication_id}");
        }
        Some(Commands::Due { at }) => {
            let now = resolve_at(at)?;
            let evaluator = evaluator(Arc::new(store), Arc::new(LogDispatcher))?;
            let due = evaluator.due_at(now)?;
            if due.is_empty() {
                println!("Nothing due at {}.", now.format("%H:%M:%S"));
            }
            for reminder in due {
                match &reminder.delivery {
                    Ok(delivery) => println!(
                        "{} {} -> {}: {}",
                        reminder.scheduled, reminder.medication_name, delivery.to, delivery.body
                    ),
                    Err(e) => println!(
                        "{} {} skipped: {}",
                        reminder.scheduled, reminder.medication_name, e
                    ),
                }
            }
        }
        Some(Commands::Remind { at, dry_run }) => {
            let now = resolve_at(at)?;
            let dispatcher: Arc<dyn NotificationDispatcher> = if dry_run {
                Arc::new(LogDispatcher)
            } else {
                Arc::new(TwilioDispatcher::new(TwilioConfig::from_env_values(
                    std::env::var("TWILIO_ACCOUNT_SID").ok(),
                    std::env::var("TWILIO_AUTH_TOKEN").ok(),
                    std::env::var("TWILIO_FROM_NUMBER").ok(),
                    std::env::var("TWILIO_CHANNEL").ok(),
                    std::env::var("TWILIO_API_BASE").ok(),
                )?)?)
            };
            let evaluator = evaluator(Arc::new(store), dispatcher)?;
            let results = evaluator.evaluate_due(now).await?;
            for result in &results {
                match &result.outcome {
                    Ok(()) => println!(
                        "sent {} reminder for medication {} to {}",
                        result.scheduled,
                        result.medication_id,
                        result.recipient.as_deref().unwrap_or("?")
                    ),
                    Err(e) => println!("not sent: {e}"),
                }
            }
            let summary = PassSummary::from_results(&results);
            println!(
                "due: {}, sent: {}, failed: {}, skipped: {}",
                summary.due, summary.sent, summary.failed, summary.skipped
            );
        }
        Some(Commands::AttachImage { patient_id, path }) => {
            let (filename, bytes) = read_upload(&path)?;
            let meta = store.attach_profile_image(&RecordId::parse(&patient_id)?, &filename, &bytes)?;
            println!("Stored profile image {} ({} bytes)", meta.hash, meta.size_bytes);
        }
        Some(Commands::AttachDicom { patient_id, path }) => {
            let (filename, bytes) = read_upload(&path)?;
            let meta = store.attach_imaging_file(&RecordId::parse(&patient_id)?, &filename, &bytes)?;
            println!("Stored DICOM file {} ({} bytes)", meta.hash, meta.size_bytes);
        }
        None => {
            println!("Use 'homecare --help' for commands");
        }
    }

    Ok(())
}

fn evaluator(
    source: Arc<dyn MedicationSource>,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> Result<ReminderEvaluator, Box<dyn std::error::Error>> {
    let config = ReminderConfig::from_env_values(
        std::env::var("REMINDER_TOLERANCE_MINUTES").ok(),
        std::env::var("REMINDER_MESSAGE_TEMPLATE").ok(),
        std::env::var("REMINDER_COUNTRY_CODE").ok(),
        std::env::var("REMINDER_MIDNIGHT_POLICY").ok(),
    )?;
    Ok(ReminderEvaluator::new(source, dispatcher, config))
}

/// `--at` value, or the current local time of day.
fn resolve_at(at: Option<String>) -> Result<NaiveTime, homecare_core::TextError> {
    match at {
        Some(value) => homecare_core::parse_time_of_day(&value),
        None => Ok(Local::now().time()),
    }
}

fn parse_times(
    times: &[String],
) -> Result<std::collections::BTreeSet<ScheduleTime>, homecare_core::TextError> {
    times
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| ScheduleTime::parse(t))
        .collect()
}

fn optional_text(
    value: Option<String>,
) -> Result<Option<NonEmptyText>, homecare_core::TextError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(NonEmptyText::new)
        .transpose()
}

fn read_upload(path: &std::path::Path) -> std::io::Result<(String, Vec<u8>)> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok((filename, bytes))
}
