use proptest::prelude::*;
use siidec::bsii::render::{format_single, parse_single};
use siidec::bsii::{decode_token, encode_token};
use siidec::crypto;

proptest! {
    #[test]
    fn decrypt_inverts_encrypt(payload in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let container = crypto::encrypt(&payload).unwrap();
        prop_assert_eq!(crypto::decrypt(&container).unwrap(), payload);
    }

    /// Two encryptions of the same payload differ (fresh IV) but both open.
    #[test]
    fn encrypt_uses_a_fresh_iv(payload in proptest::collection::vec(any::<u8>(), 1..512)) {
        let a = crypto::encrypt(&payload).unwrap();
        let b = crypto::encrypt(&payload).unwrap();
        prop_assert_ne!(&a[36..52], &b[36..52]);
        prop_assert_eq!(crypto::decrypt(&a).unwrap(), crypto::decrypt(&b).unwrap());
    }

    /// Float text form must survive a reload bit-exact, NaN included.
    #[test]
    fn float_format_roundtrips_bit_exact(bits in any::<u32>()) {
        let v = f32::from_bits(bits);
        let text = format_single(v);
        let back = parse_single(&text).unwrap();
        prop_assert_eq!(back.to_bits(), v.to_bits());
    }

    #[test]
    fn token_roundtrips(s in "[0-9a-z_]{0,12}") {
        prop_assert_eq!(decode_token(encode_token(&s).unwrap()), s);
    }
}
