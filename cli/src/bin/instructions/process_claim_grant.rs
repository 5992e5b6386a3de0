use levx_claim::{
    auth::{redirect_uri, AuthSession, Authenticator, LoginMethod},
    error::ClaimError,
    flows::grant::{GrantFlow, GrantProgram},
    grant::GrantClient,
};

use crate::*;

/// Access token obtained from a login completed in the browser.
struct AccessToken(String);

impl Authenticator for AccessToken {
    async fn login(
        &self,
        method: LoginMethod,
        redirect_uri: &str,
    ) -> levx_claim::error::Result<String> {
        Err(ClaimError::Authentication(format!(
            "log in with {} at {redirect_uri} in a browser",
            method.connection()
        )))
    }

    async fn logout(&self, _return_to: &str) -> levx_claim::error::Result<()> {
        Ok(())
    }

    async fn access_token(&self, _scopes: &str) -> levx_claim::error::Result<String> {
        Ok(self.0.clone())
    }
}

pub async fn process_claim_grant(args: &Args, claim_grant_args: &ClaimGrantArgs) -> Result<()> {
    let program = match claim_grant_args.program {
        Program::Zero => GrantProgram::Zero,
        Program::LevxDistribution => GrantProgram::LevxDistribution,
    };
    let Some(access_token) = claim_grant_args.access_token.clone() else {
        let methods = program
            .login_methods()
            .iter()
            .map(|m| m.connection())
            .collect::<Vec<_>>()
            .join(" or ");
        let app = redirect_uri("https:", &claim_grant_args.app_host, None, program.route());
        return Err(anyhow!(
            "no access token; log in with {methods} at {app} and pass --access-token"
        ));
    };

    let auth = Arc::new(AuthSession::new(AccessToken(access_token)));
    let flow = GrantFlow::new(
        program,
        GrantClient::new(claim_grant_args.api_server.clone()),
        auth,
        &args.deployments()?,
    );
    run_flow(args, flow, false).await
}
