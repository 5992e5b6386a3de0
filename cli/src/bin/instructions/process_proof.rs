use crate::*;

pub fn process_proof(proof_args: &ProofArgs) -> Result<()> {
    let table = load_table(&proof_args.campaigns_path, &proof_args.name)?;
    match table.resolve(proof_args.claimant)? {
        Some(eligibility) => println!("{}", serde_json::to_string_pretty(&eligibility)?),
        None => println!("{} is not in {}", proof_args.claimant, proof_args.name),
    }
    Ok(())
}
