// shared RSA key pairs for tests, generated once per test binary

use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;

lazy_static! {
    pub static ref SENDER: TestKeyPair = TestKeyPair::generate();
    pub static ref RECIPIENT: TestKeyPair = TestKeyPair::generate();
    pub static ref STRANGER: TestKeyPair = TestKeyPair::generate();
}

pub struct TestKeyPair {
    pub rsa: Rsa<Private>,
}

impl TestKeyPair {
    fn generate() -> TestKeyPair {
        TestKeyPair { rsa: Rsa::generate(2048).expect("cannot generate RSA key") }
    }

    pub fn public_pem(&self) -> String {
        pem_string(self.rsa.public_key_to_pem().unwrap())
    }

    pub fn public_pem_pkcs1(&self) -> String {
        pem_string(self.rsa.public_key_to_pem_pkcs1().unwrap())
    }

    pub fn public_der(&self) -> Vec<u8> {
        self.rsa.public_key_to_der().unwrap()
    }

    pub fn public_base64(&self) -> String {
        strip_armour(&self.public_pem())
    }

    pub fn private_pem(&self) -> String {
        let private_key = PKey::from_rsa(self.rsa.clone()).unwrap();
        pem_string(private_key.private_key_to_pem_pkcs8().unwrap())
    }

    pub fn private_pem_pkcs1(&self) -> String {
        pem_string(self.rsa.private_key_to_pem().unwrap())
    }

    pub fn private_base64(&self) -> String {
        strip_armour(&self.private_pem())
    }
}

fn pem_string(pem: Vec<u8>) -> String {
    String::from_utf8(pem).unwrap()
}

// raw base64 body on a single line, as keys are often pasted
fn strip_armour(pem: &str) -> String {
    pem.lines()
        .filter(|line| !line.starts_with("-----"))
        .collect()
}
